//! Test data generation for benchmarks.
//!
//! Generators are seeded so every run sees the same rows.

use navload_core::{Entity, EntityDef, RelationDef, SchemaBundle};
use navload_proto::Value;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scale factor for benchmark data generation.
#[derive(Clone, Copy, Debug)]
pub enum Scale {
    /// 10 users, 20 posts, 20 comments.
    Tiny,
    /// 100 users, 500 posts, 1,500 comments.
    Small,
    /// 2,000 users, 10,000 posts, 20,000 comments.
    Medium,
    /// 100,000 users, ten posts each.
    Large,
}

impl Scale {
    /// Get the user count for this scale.
    pub fn count(&self) -> usize {
        match self {
            Scale::Tiny => 10,
            Scale::Small => 100,
            Scale::Medium => 2_000,
            Scale::Large => 100_000,
        }
    }

    /// Get the posts per user ratio.
    pub fn posts_per_user(&self) -> usize {
        match self {
            Scale::Tiny => 2,
            Scale::Small => 5,
            Scale::Medium => 5,
            Scale::Large => 10,
        }
    }

    /// Get the comments per post ratio.
    pub fn comments_per_post(&self) -> usize {
        match self {
            Scale::Tiny => 1,
            Scale::Small => 3,
            Scale::Medium => 2,
            Scale::Large => 5,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Small
    }
}

/// User entity data for benchmarks.
pub struct UserData {
    pub id: [u8; 16],
    pub name: String,
    pub email: String,
    pub age: i32,
    pub status: String,
}

/// Post entity data for benchmarks.
pub struct PostData {
    pub id: [u8; 16],
    pub title: String,
    pub content: String,
    pub author_id: [u8; 16],
    pub views: i64,
    pub published: bool,
}

/// Comment entity data for benchmarks.
pub struct CommentData {
    pub id: [u8; 16],
    pub text: String,
    pub post_id: [u8; 16],
    pub author_id: [u8; 16],
}

/// Generate a deterministic UUID from seed and index.
fn generate_uuid(seed: u64, index: usize) -> [u8; 16] {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
    let mut id = [0u8; 16];
    rng.fill(&mut id);
    id
}

fn random_string(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Generate User entities with realistic field distribution.
pub fn generate_users(count: usize) -> Vec<UserData> {
    const SEED: u64 = 12345;
    let mut rng = StdRng::seed_from_u64(SEED);

    let statuses = ["active", "inactive", "pending", "admin"];
    let name_prefixes = [
        "Alice", "Bob", "Charlie", "David", "Eve", "Frank", "Grace", "Henry", "Ivy", "Jack",
    ];

    (0..count)
        .map(|i| UserData {
            id: generate_uuid(SEED, i),
            name: format!("{}_{}", name_prefixes[i % name_prefixes.len()], i),
            email: format!("user{}@example{}.com", i, i % 10),
            age: 18 + (rng.gen::<u32>() % 60) as i32,
            status: statuses[i % statuses.len()].to_string(),
        })
        .collect()
}

/// Generate Post entities with foreign keys to Users.
pub fn generate_posts(count: usize, user_ids: &[[u8; 16]]) -> Vec<PostData> {
    const SEED: u64 = 54321;
    let mut rng = StdRng::seed_from_u64(SEED);

    (0..count)
        .map(|i| PostData {
            id: generate_uuid(SEED, i),
            title: format!("Post Title {}: {}", i, random_string(&mut rng, 20)),
            content: random_string(&mut rng, 200),
            author_id: user_ids[i % user_ids.len()],
            views: rng.gen_range(0..1_000_000),
            published: rng.gen_bool(0.8),
        })
        .collect()
}

/// Generate Comment entities with foreign keys to Posts and Users.
pub fn generate_comments(
    count: usize,
    post_ids: &[[u8; 16]],
    user_ids: &[[u8; 16]],
) -> Vec<CommentData> {
    const SEED: u64 = 98765;
    let mut rng = StdRng::seed_from_u64(SEED);

    (0..count)
        .map(|i| CommentData {
            id: generate_uuid(SEED, i),
            text: random_string(&mut rng, 100),
            post_id: post_ids[i % post_ids.len()],
            author_id: user_ids[i % user_ids.len()],
        })
        .collect()
}

/// Convert UserData to an entity row.
pub fn user_entity(user: &UserData) -> Entity {
    Entity::new("User")
        .with_field("id", Value::Uuid(user.id))
        .with_field("name", user.name.as_str())
        .with_field("email", user.email.as_str())
        .with_field("age", user.age)
        .with_field("status", user.status.as_str())
}

/// Convert PostData to an entity row.
pub fn post_entity(post: &PostData) -> Entity {
    Entity::new("Post")
        .with_field("id", Value::Uuid(post.id))
        .with_field("title", post.title.as_str())
        .with_field("content", post.content.as_str())
        .with_field("author_id", Value::Uuid(post.author_id))
        .with_field("views", post.views)
        .with_field("published", post.published)
}

/// Convert CommentData to an entity row.
pub fn comment_entity(comment: &CommentData) -> Entity {
    Entity::new("Comment")
        .with_field("id", Value::Uuid(comment.id))
        .with_field("text", comment.text.as_str())
        .with_field("post_id", Value::Uuid(comment.post_id))
        .with_field("author_id", Value::Uuid(comment.author_id))
}

/// Create the blog schema (User -> Posts -> Comments).
pub fn blog_schema() -> SchemaBundle {
    let user = EntityDef::new("User", "id").with_fields(["name", "email", "age", "status"]);
    let post = EntityDef::new("Post", "id")
        .with_fields(["title", "content", "author_id", "views", "published"]);
    let comment = EntityDef::new("Comment", "id").with_fields(["text", "post_id", "author_id"]);

    SchemaBundle::new(1)
        .with_entity(user)
        .with_entity(post)
        .with_entity(comment)
        .with_relation(RelationDef::one_to_many(
            "posts", "User", "id", "Post", "author_id",
        ))
        .with_relation(RelationDef::one_to_many(
            "comments", "Post", "id", "Comment", "post_id",
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_users(5);
        let b = generate_users(5);
        assert!(a.iter().zip(&b).all(|(x, y)| x.id == y.id && x.age == y.age));
    }

    #[test]
    fn test_foreign_keys_point_at_parents() {
        let users = generate_users(3);
        let user_ids: Vec<_> = users.iter().map(|u| u.id).collect();
        let posts = generate_posts(7, &user_ids);

        assert!(posts.iter().all(|p| user_ids.contains(&p.author_id)));
        assert_eq!(posts[3].author_id, user_ids[0]);
    }

    #[test]
    fn test_scale_ratios() {
        assert_eq!(Scale::Tiny.count() * Scale::Tiny.posts_per_user(), 20);
        assert_eq!(Scale::default().count(), 100);
    }
}
