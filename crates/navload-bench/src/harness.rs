//! Benchmark harness helpers.

use navload_core::proto::{NavExpr, NavigationDescription};
use navload_core::{
    include_chain, Catalog, EntityQuery, EntityRef, Error, Loader, LoaderConfig, MemorySource,
    QuerySource,
};

use crate::fixtures::{
    blog_schema, comment_entity, generate_comments, generate_posts, generate_users, post_entity,
    user_entity, Scale,
};

/// Test context for benchmarks.
///
/// Owns an in-memory source populated with blog data, its catalog, and a
/// loader.
pub struct TestContext {
    pub source: MemorySource,
    pub catalog: Catalog,
    pub loader: Loader,
}

impl TestContext {
    /// Create a context with the blog schema and no rows.
    pub fn new() -> Self {
        Self {
            source: MemorySource::new(),
            catalog: Catalog::with_schema(blog_schema()),
            loader: Loader::default(),
        }
    }

    /// Create a context with the blog schema and populated data.
    pub fn with_scale(scale: Scale) -> Self {
        let ctx = Self::new();
        populate_source(&ctx.source, scale);
        ctx
    }

    /// Replace the loader configuration.
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.loader = Loader::new(config);
        self
    }

    /// Load `description` with one query per hop.
    pub fn load_batched(
        &self,
        description: &NavigationDescription,
    ) -> Result<Vec<EntityRef>, Error> {
        include_chain(
            EntityQuery::new(description.root_type.clone()),
            description.clone(),
        )
        .execute(&self.loader, &self.source, &self.catalog)
    }

    /// Load the first hop of `description` with one query per parent.
    pub fn load_naive(
        &self,
        description: &NavigationDescription,
    ) -> Result<Vec<EntityRef>, Error> {
        let chain = self.loader.resolve(&self.catalog, description)?;
        let roots = self
            .source
            .execute(&EntityQuery::new(description.root_type.clone()))
            .map_err(Error::Query)?;
        for root in &roots {
            self.loader.load_one(&self.source, Some(root), &chain)?;
        }
        Ok(roots)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill `source` with users, posts and comments at `scale`.
pub fn populate_source(source: &MemorySource, scale: Scale) {
    let users = generate_users(scale.count());
    let user_ids: Vec<_> = users.iter().map(|u| u.id).collect();

    let posts = generate_posts(users.len() * scale.posts_per_user(), &user_ids);
    let post_ids: Vec<_> = posts.iter().map(|p| p.id).collect();

    let comments = generate_comments(posts.len() * scale.comments_per_post(), &post_ids, &user_ids);

    source.insert_all(users.iter().map(user_entity));
    source.insert_all(posts.iter().map(post_entity));
    source.insert_all(comments.iter().map(comment_entity));
}

/// `User => user.posts`
pub fn posts_of_users() -> NavigationDescription {
    NavigationDescription::new("User", "Post", NavExpr::member("posts"))
}

/// `User => user.posts.SelectMany(p => p.comments)`
pub fn comments_of_users() -> NavigationDescription {
    NavigationDescription::new(
        "User",
        "Comment",
        NavExpr::member("posts").select_many(NavExpr::member("comments")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(users: &[EntityRef]) -> Vec<usize> {
        users
            .iter()
            .map(|u| u.collection("posts").map_or(usize::MAX, |c| c.len()))
            .collect()
    }

    #[test]
    fn test_naive_and_batched_agree() {
        let ctx = TestContext::with_scale(Scale::Tiny);

        let naive = ctx.load_naive(&posts_of_users()).unwrap();
        let naive_queries = ctx.source.query_count();
        ctx.source.reset_stats();
        let batched = ctx.load_batched(&posts_of_users()).unwrap();

        assert_eq!(shape(&naive), shape(&batched));
        assert_eq!(naive_queries, 1 + Scale::Tiny.count() as u64);
        assert_eq!(ctx.source.query_count(), 2);
    }

    #[test]
    fn test_two_hops_hydrate_every_comment() {
        let ctx = TestContext::with_scale(Scale::Tiny);
        let users = ctx.load_batched(&comments_of_users()).unwrap();

        let comments: usize = users
            .iter()
            .flat_map(|u| u.collection("posts").unwrap_or_default())
            .map(|p| p.collection("comments").map_or(0, |c| c.len()))
            .sum();
        assert_eq!(comments, ctx.source.len("Comment"));
    }
}
