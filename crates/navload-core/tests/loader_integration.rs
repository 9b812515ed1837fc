//! Integration tests for navigation resolution and loading.

use std::collections::BTreeSet;
use std::fmt;

use navload_core::proto::{FilterExpr, NavExpr, NavigationDescription, OrderSpec, Value};
use navload_core::{
    include_chain, Catalog, ConfigError, Entity, EntityDef, EntityQuery, EntityRef, Error,
    LoadBudget, Loader, LoaderConfig, MemorySource, ModifierApplier, QuerySource, RelationDef,
    SchemaBundle, SourceError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn blog_catalog() -> Catalog {
    let user = EntityDef::new("User", "id").with_fields(["name", "active"]);
    let post =
        EntityDef::new("Post", "id").with_fields(["author_id", "title", "views", "published"]);
    let comment =
        EntityDef::new("Comment", "id").with_fields(["post_id", "author_id", "text", "rank"]);
    let tag = EntityDef::with_composite_key("Tag", vec!["post_id".into(), "label".into()]);
    let tag_note = EntityDef::new("TagNote", "id").with_field("tag_id");

    Catalog::with_schema(
        SchemaBundle::new(1)
            .with_entity(user)
            .with_entity(post)
            .with_entity(comment)
            .with_entity(tag)
            .with_entity(tag_note)
            .with_relation(RelationDef::one_to_many(
                "posts", "User", "id", "Post", "author_id",
            ))
            .with_relation(RelationDef::one_to_many(
                "comments", "Post", "id", "Comment", "post_id",
            ))
            .with_relation(RelationDef::one_to_many(
                "authored_comments",
                "User",
                "id",
                "Comment",
                "author_id",
            ))
            .with_relation(
                RelationDef::one_to_many("tags", "Post", "id", "Tag", "post_id").read_only(),
            )
            .with_relation(RelationDef::one_to_many(
                "labels", "Post", "id", "Tag", "post_id",
            ))
            .with_relation(RelationDef::one_to_many(
                "notes", "Tag", "label", "TagNote", "tag_id",
            )),
    )
}

fn user(id: i64, name: &str, active: bool) -> Entity {
    Entity::new("User")
        .with_field("id", id)
        .with_field("name", name)
        .with_field("active", active)
}

fn post(id: i64, author: Option<i64>, title: &str, views: i64, published: bool) -> Entity {
    Entity::new("Post")
        .with_field("id", id)
        .with_field("author_id", author)
        .with_field("title", title)
        .with_field("views", views)
        .with_field("published", published)
}

fn comment(id: i64, post_id: i64, author: i64, rank: i64) -> Entity {
    Entity::new("Comment")
        .with_field("id", id)
        .with_field("post_id", post_id)
        .with_field("author_id", author)
        .with_field("text", format!("comment {id}"))
        .with_field("rank", rank)
}

fn blog_source() -> MemorySource {
    MemorySource::new().with_rows([
        user(1, "Alice", true),
        user(2, "Bob", true),
        user(3, "Carol", false),
        post(10, Some(1), "b-title", 5, true),
        post(11, Some(1), "a-title", 50, false),
        post(12, Some(2), "c-title", 20, true),
        post(13, None, "orphan", 0, true),
        comment(100, 10, 2, 2),
        comment(101, 10, 3, 1),
        comment(102, 12, 1, 1),
        comment(103, 11, 2, 3),
        comment(104, 10, 2, 1),
    ])
}

fn id_of(entity: &EntityRef) -> i64 {
    entity.get("id").and_then(|v| v.as_i64()).unwrap()
}

fn ids(entities: &[EntityRef]) -> Vec<i64> {
    entities.iter().map(id_of).collect()
}

fn collection_ids(parent: &EntityRef, property: &str) -> Vec<i64> {
    ids(&parent.collection(property).expect("collection not assigned"))
}

fn find(entities: &[EntityRef], id: i64) -> &EntityRef {
    entities.iter().find(|e| id_of(e) == id).unwrap()
}

fn posts_of_users() -> NavigationDescription {
    NavigationDescription::new("User", "Post", NavExpr::member("posts"))
}

fn comments_of_users() -> NavigationDescription {
    NavigationDescription::new(
        "User",
        "Comment",
        NavExpr::member("posts").select_many(NavExpr::member("comments")),
    )
}

#[test]
fn test_documented_example() {
    init_tracing();
    let catalog = Catalog::with_schema(
        SchemaBundle::new(1)
            .with_entity(EntityDef::new("A", "id"))
            .with_entity(EntityDef::new("B", "id").with_field("aId"))
            .with_relation(RelationDef::one_to_many("bs", "A", "id", "B", "aId")),
    );
    let source = MemorySource::new().with_rows([
        Entity::new("A").with_field("id", 1i64),
        Entity::new("A").with_field("id", 2i64),
        Entity::new("B").with_field("id", 10i64).with_field("aId", 1i64),
        Entity::new("B").with_field("id", 11i64).with_field("aId", 1i64),
        Entity::new("B").with_field("id", 12i64).with_field("aId", 2i64),
    ]);

    let roots = include_chain(
        EntityQuery::new("A"),
        NavigationDescription::new("A", "B", NavExpr::member("bs")),
    )
    .execute(&Loader::default(), &source, &catalog)
    .unwrap();

    assert_eq!(collection_ids(find(&roots, 1), "bs"), vec![10, 11]);
    assert_eq!(collection_ids(find(&roots, 2), "bs"), vec![12]);
}

#[test]
fn test_every_parent_gets_exactly_its_children() {
    init_tracing();
    let catalog = blog_catalog();
    let source = blog_source();

    let users = include_chain(EntityQuery::new("User"), posts_of_users())
        .execute(&Loader::default(), &source, &catalog)
        .unwrap();

    let all_posts = source.execute(&EntityQuery::new("Post")).unwrap();
    for user in &users {
        let expected: BTreeSet<i64> = all_posts
            .iter()
            .filter(|p| p.get("author_id").and_then(|v| v.as_i64()) == Some(id_of(user)))
            .map(id_of)
            .collect();
        let loaded = collection_ids(user, "posts");
        let unique: BTreeSet<i64> = loaded.iter().copied().collect();

        assert_eq!(unique.len(), loaded.len(), "duplicates for user {}", id_of(user));
        assert_eq!(unique, expected);
    }

    // Carol has no posts but still gets an assigned, empty collection.
    assert!(find(&users, 3).collection("posts").unwrap().is_empty());
}

#[test]
fn test_where_matches_in_memory_filter() {
    let catalog = blog_catalog();
    let source = blog_source();
    let predicate = FilterExpr::and(vec![
        FilterExpr::eq("published", true),
        FilterExpr::ge("views", 5i64),
    ]);

    let filtered = include_chain(
        EntityQuery::new("User"),
        NavigationDescription::new(
            "User",
            "Post",
            NavExpr::member("posts").filter(predicate.clone()),
        ),
    )
    .execute(&Loader::default(), &source, &catalog)
    .unwrap();

    let unfiltered = include_chain(EntityQuery::new("User"), posts_of_users())
        .execute(&Loader::default(), &source, &catalog)
        .unwrap();

    for user in &unfiltered {
        let all = user.collection("posts").unwrap();
        let expected = ModifierApplier::apply_in_memory(
            all,
            &[navload_core::Modifier::Where(predicate.clone())],
        );
        assert_eq!(
            collection_ids(find(&filtered, id_of(user)), "posts"),
            ids(&expected)
        );
    }
    assert_eq!(collection_ids(find(&filtered, 1), "posts"), vec![10]);
}

#[test]
fn test_order_by_then_by() {
    let catalog = blog_catalog();
    let source = blog_source();

    let description = NavigationDescription::new(
        "Post",
        "Comment",
        NavExpr::member("comments").order_by("rank").then_by_desc("id"),
    );
    let posts = include_chain(EntityQuery::new("Post"), description)
        .execute(&Loader::default(), &source, &catalog)
        .unwrap();

    assert_eq!(collection_ids(find(&posts, 10), "comments"), vec![104, 101, 100]);
    assert_eq!(collection_ids(find(&posts, 11), "comments"), vec![103]);
    assert!(collection_ids(find(&posts, 13), "comments").is_empty());
}

#[test]
fn test_two_hop_chain_matches_manual_composition() {
    let catalog = blog_catalog();
    let source = blog_source();
    let loader = Loader::default();

    let (users, report) = include_chain(EntityQuery::new("User"), comments_of_users())
        .execute_with_report(&loader, &source, &catalog)
        .unwrap();

    // One root query plus one per hop.
    assert_eq!(report.queries_issued, 3);
    assert_eq!(report.hops_executed, 2);
    assert_eq!(source.query_count(), 3);

    // Manual composition: load posts, then load comments onto those posts.
    let manual_users = source.execute(&EntityQuery::new("User")).unwrap();
    let posts_chain = loader.resolve(&catalog, &posts_of_users()).unwrap();
    loader
        .load_many(&source, &EntityQuery::new("User"), &manual_users, &posts_chain)
        .unwrap();
    let manual_posts: Vec<EntityRef> = manual_users
        .iter()
        .flat_map(|u| u.collection("posts").unwrap())
        .collect();
    let comments_chain = loader
        .resolve(
            &catalog,
            &NavigationDescription::new("Post", "Comment", NavExpr::member("comments")),
        )
        .unwrap();
    loader
        .load_many(&source, &EntityQuery::new("Post"), &manual_posts, &comments_chain)
        .unwrap();

    for user in &users {
        let manual_user = find(&manual_users, id_of(user));
        assert_eq!(collection_ids(user, "posts"), collection_ids(manual_user, "posts"));
        for post in user.collection("posts").unwrap() {
            let manual_post = find(&manual_posts, id_of(&post));
            assert_eq!(
                collection_ids(&post, "comments"),
                collection_ids(manual_post, "comments")
            );
        }
    }

    let alice = find(&users, 1);
    let alice_posts = alice.collection("posts").unwrap();
    assert_eq!(collection_ids(find(&alice_posts, 10), "comments"), vec![100, 101, 104]);
    assert_eq!(collection_ids(find(&alice_posts, 11), "comments"), vec![103]);
}

#[test]
fn test_root_filters_restrict_every_hop() {
    let catalog = blog_catalog();
    let source = blog_source();

    let root = EntityQuery::new("User")
        .filter(FilterExpr::eq("name", "Bob"))
        .order_by(OrderSpec::desc("id"));
    let users = include_chain(root, comments_of_users())
        .execute(&Loader::default(), &source, &catalog)
        .unwrap();

    assert_eq!(ids(&users), vec![2]);
    let posts = users[0].collection("posts").unwrap();
    assert_eq!(ids(&posts), vec![12]);
    assert_eq!(collection_ids(&posts[0], "comments"), vec![102]);

    // The last hop query is rooted at the filtered users.
    let last = source.executed_queries().pop().unwrap();
    assert_eq!(last.entity_type, "User");
    assert_eq!(last.result_type(), "Comment");
}

#[test]
fn test_single_item_load_is_shallow_and_never_fails_on_empty() {
    let catalog = blog_catalog();
    let source = blog_source();
    let loader = Loader::default();
    let include = include_chain(EntityQuery::new("User"), comments_of_users());

    let alice = EntityRef::new(user(1, "Alice", true));
    let report = include.load_one(&loader, Some(&alice), &source, &catalog).unwrap();
    assert_eq!(report.queries_issued, 1);
    let posts = alice.collection("posts").unwrap();
    assert_eq!(ids(&posts), vec![10, 11]);
    assert!(posts.iter().all(|p| !p.is_loaded("comments")));

    let carol = EntityRef::new(user(3, "Carol", false));
    include.load_one(&loader, Some(&carol), &source, &catalog).unwrap();
    assert_eq!(carol.collection("posts").map(|c| c.len()), Some(0));

    let report = include.load_one(&loader, None, &source, &catalog).unwrap();
    assert_eq!(report.queries_issued, 0);
}

#[test]
fn test_read_only_relationship_fails_before_any_query() {
    let catalog = blog_catalog();
    let source = blog_source();

    let description = NavigationDescription::new("Post", "Tag", NavExpr::member("tags"));
    let err = include_chain(EntityQuery::new("Post"), description)
        .execute(&Loader::default(), &source, &catalog)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Configuration(ConfigError::MissingSetter { ref entity, ref property })
            if entity == "Post" && property == "tags"
    ));
    assert_eq!(source.query_count(), 0);
}

#[test]
fn test_composite_key_parent_fails_before_any_query() {
    let catalog = blog_catalog();
    let source = blog_source();

    let description = NavigationDescription::new("Tag", "TagNote", NavExpr::member("notes"));
    let err = include_chain(EntityQuery::new("Tag"), description)
        .execute(&Loader::default(), &source, &catalog)
        .unwrap_err();

    assert!(err.to_string().contains("multiple keys not supported"));
    match err {
        Error::Configuration(ConfigError::CompositeKey { entity, count }) => {
            assert_eq!(entity, "Tag");
            assert_eq!(count, 2);
        }
        other => panic!("expected composite key error, got {other}"),
    }
    assert_eq!(source.query_count(), 0);
}

#[test]
fn test_composite_key_mid_chain_fails_before_any_query() {
    let catalog = blog_catalog();
    let source = blog_source();

    let description = NavigationDescription::new(
        "Post",
        "TagNote",
        NavExpr::member("labels").select_many(NavExpr::member("notes")),
    );
    let err = include_chain(EntityQuery::new("Post"), description)
        .execute(&Loader::default(), &source, &catalog)
        .unwrap_err();

    match err {
        Error::Configuration(ConfigError::CompositeKey { entity, count }) => {
            assert_eq!(entity, "Tag");
            assert_eq!(count, 2);
        }
        other => panic!("expected composite key error, got {other}"),
    }
    assert_eq!(source.query_count(), 0);
}

#[test]
fn test_unsupported_method_fails_before_any_query() {
    let catalog = blog_catalog();
    let source = blog_source();

    let description = NavigationDescription::new(
        "User",
        "Post",
        NavExpr::member("posts").call("Distinct", Vec::new()),
    );
    let err = include_chain(EntityQuery::new("User"), description)
        .execute(&Loader::default(), &source, &catalog)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Configuration(ConfigError::UnsupportedOperation(ref m)) if m == "Distinct"
    ));
    assert_eq!(source.query_count(), 0);
}

#[test]
fn test_every_chain_resolves_before_the_root_query() {
    let catalog = blog_catalog();
    let source = blog_source();

    let err = include_chain(EntityQuery::new("User"), posts_of_users())
        .include(NavigationDescription::new(
            "User",
            "Post",
            NavExpr::member("posts").order_by("missing_field"),
        ))
        .execute(&Loader::default(), &source, &catalog)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Configuration(ConfigError::UnknownField { .. })
    ));
    assert_eq!(source.query_count(), 0);
}

#[test]
fn test_root_type_must_match_chain() {
    let catalog = blog_catalog();
    let source = blog_source();

    let err = include_chain(EntityQuery::new("Post"), posts_of_users())
        .execute(&Loader::default(), &source, &catalog)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigError::RootTypeMismatch { .. })
    ));
}

#[test]
fn test_pushdown_and_in_memory_agree() {
    let catalog = blog_catalog();
    let description = NavigationDescription::new(
        "User",
        "Comment",
        NavExpr::member("posts")
            .filter(FilterExpr::eq("published", true))
            .order_by_desc("views")
            .select_many(
                NavExpr::member("comments")
                    .filter(FilterExpr::le("rank", 2i64))
                    .order_by("rank")
                    .then_by("id"),
            ),
    );

    let load = |pushdown: bool| {
        let source = blog_source();
        let loader = Loader::new(LoaderConfig::new().modifier_pushdown(pushdown));
        let users = include_chain(EntityQuery::new("User"), description.clone())
            .execute(&loader, &source, &catalog)
            .unwrap();
        users
            .iter()
            .map(|u| {
                let posts = u.collection("posts").unwrap();
                let nested: Vec<Vec<i64>> =
                    posts.iter().map(|p| collection_ids(p, "comments")).collect();
                (id_of(u), ids(&posts), nested)
            })
            .collect::<Vec<_>>()
    };

    let pushed = load(true);
    assert_eq!(pushed, load(false));
    assert_eq!(pushed[0], (1, vec![10], vec![vec![101, 104, 100]]));
}

#[test]
fn test_parallel_chains_match_sequential() {
    let catalog = blog_catalog();
    let authored = NavigationDescription::new(
        "User",
        "Comment",
        NavExpr::member("authored_comments").order_by("id"),
    );

    let load = |parallel: bool| {
        let source = blog_source();
        let loader = Loader::new(LoaderConfig::new().parallel_chains(parallel));
        let (users, report) = include_chain(EntityQuery::new("User"), posts_of_users())
            .include(authored.clone())
            .execute_with_report(&loader, &source, &catalog)
            .unwrap();
        let shape: Vec<(i64, Vec<i64>, Vec<i64>)> = users
            .iter()
            .map(|u| {
                (
                    id_of(u),
                    collection_ids(u, "posts"),
                    collection_ids(u, "authored_comments"),
                )
            })
            .collect();
        (shape, report.queries_issued)
    };

    let (sequential, queries) = load(false);
    let (parallel, parallel_queries) = load(true);
    assert_eq!(sequential, parallel);
    assert_eq!(queries, 3);
    assert_eq!(parallel_queries, 3);
    assert_eq!(sequential[1], (2, vec![12], vec![100, 103, 104]));
}

#[test]
fn test_resolution_cache_reuses_chains() {
    let catalog = blog_catalog();
    let source = blog_source();
    let loader = Loader::new(LoaderConfig::new().with_resolution_cache(8));
    let include = include_chain(EntityQuery::new("User"), comments_of_users());

    include.execute(&loader, &source, &catalog).unwrap();
    include.execute(&loader, &source, &catalog).unwrap();

    let stats = loader.cache().unwrap().stats();
    assert_eq!(stats.misses(), 1);
    assert_eq!(stats.hits(), 1);

    // A schema change invalidates cached chains.
    catalog.apply_schema(catalog.current_schema());
    include.execute(&loader, &source, &catalog).unwrap();
    assert_eq!(loader.cache().unwrap().stats().misses(), 2);
}

#[test]
fn test_depth_budget_is_enforced() {
    let catalog = blog_catalog();
    let source = blog_source();
    let loader = Loader::new(LoaderConfig::new().budget(LoadBudget::new(1, 1_000)));

    let err = include_chain(EntityQuery::new("User"), comments_of_users())
        .execute(&loader, &source, &catalog)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigError::DepthExceeded { depth: 2, max: 1 })
    ));
    assert_eq!(source.query_count(), 0);
}

#[test]
fn test_description_from_json() {
    let catalog = blog_catalog();
    let source = blog_source();
    let json = r#"{
        "root_type": "User",
        "leaf_type": "Post",
        "body": {
            "kind": "call",
            "method": "OrderByDescending",
            "source": { "kind": "member", "property": "posts" },
            "args": [ { "key": "views" } ]
        }
    }"#;

    let description = NavigationDescription::from_json(json).unwrap();
    let users = include_chain(EntityQuery::new("User"), description)
        .execute(&Loader::default(), &source, &catalog)
        .unwrap();
    assert_eq!(collection_ids(find(&users, 1), "posts"), vec![11, 10]);
}

#[derive(Debug)]
struct Unavailable;

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("database unavailable")
    }
}

impl std::error::Error for Unavailable {}

/// Serves root queries, fails every hop query.
struct FailingHops(MemorySource);

impl QuerySource for FailingHops {
    fn execute(&self, query: &EntityQuery) -> Result<Vec<EntityRef>, SourceError> {
        if query.hop_count() > 0 {
            return Err(Box::new(Unavailable));
        }
        self.0.execute(query)
    }
}

#[test]
fn test_query_errors_propagate_unmodified() {
    let catalog = blog_catalog();
    let source = FailingHops(blog_source());

    let err = include_chain(EntityQuery::new("User"), posts_of_users())
        .execute(&Loader::default(), &source, &catalog)
        .unwrap_err();

    match err {
        Error::Query(inner) => assert!(inner.downcast_ref::<Unavailable>().is_some()),
        other => panic!("expected query error, got {other}"),
    }
}

#[test]
fn test_null_foreign_keys_match_nothing() {
    let catalog = blog_catalog();
    let source = blog_source();

    let users = include_chain(EntityQuery::new("User"), posts_of_users())
        .execute(&Loader::default(), &source, &catalog)
        .unwrap();

    let assigned: usize = users
        .iter()
        .map(|u| u.collection("posts").unwrap().len())
        .sum();
    // Post 13 has a null author and belongs to nobody.
    assert_eq!(assigned, 3);
    assert!(users
        .iter()
        .flat_map(|u| u.collection("posts").unwrap())
        .all(|p| p.get("author_id") != Some(Value::Null)));
}
