//! Single-parent, first-hop loader.

use std::time::Instant;

use navload_proto::FilterExpr;
use tracing::{debug, instrument, warn};

use crate::config::LoaderConfig;
use crate::entity::EntityRef;
use crate::error::{ConfigError, Error};
use crate::path::NavigationChain;
use crate::query::{EntityQuery, QuerySource};

use super::report::LoadReport;
use super::{check_hop_budget, fetch_children};

/// Hydrates the first hop of a chain on one parent.
///
/// Deeper hops are not cascaded: single-item loading hydrates exactly one
/// relationship level per call, leaving the children's own collections
/// unloaded.
#[derive(Clone, Copy)]
pub struct SingleItemLoader<'a> {
    source: &'a dyn QuerySource,
    config: &'a LoaderConfig,
}

impl<'a> SingleItemLoader<'a> {
    /// Create a single-item loader.
    pub fn new(source: &'a dyn QuerySource, config: &'a LoaderConfig) -> Self {
        Self { source, config }
    }

    /// Assign `parent`'s first-hop children with one foreign-key query.
    ///
    /// Absent parents are a no-op. A parent without a usable key gets an
    /// empty collection and no query is issued.
    #[instrument(skip_all, fields(chain = %chain))]
    pub fn load_one(
        &self,
        parent: Option<&EntityRef>,
        chain: &NavigationChain,
    ) -> Result<LoadReport, Error> {
        let Some(parent) = parent else {
            return Ok(LoadReport::default());
        };

        let segment = chain.first();
        let parent_type = parent.entity_type();
        if parent_type != segment.from_type() {
            return Err(ConfigError::RootTypeMismatch {
                expected: segment.from_type().to_string(),
                actual: parent_type,
            }
            .into());
        }

        let started = Instant::now();
        let mut report = LoadReport::default();

        let children = match segment.primary_key().key_of(parent) {
            Some(key) => {
                let query = EntityQuery::new(segment.to_type()).filter(FilterExpr::Eq {
                    field: segment.foreign_key().field().to_string(),
                    value: key.to_value(),
                });
                let children =
                    fetch_children(self.source, self.config, query, segment.modifiers())?;
                report.queries_issued = 1;
                check_hop_budget(self.config, 0, &segment.to_string(), children.len())?;
                children
            }
            None => {
                warn!(
                    entity = %parent_type,
                    field = segment.primary_key().field(),
                    "parent has no usable key, assigning an empty collection"
                );
                Vec::new()
            }
        };

        report.children_loaded = children.len();
        segment.setter().assign(parent, children);
        report.hops_executed = 1;
        report.entities_hydrated = 1;
        report.duration = started.elapsed();

        debug!(
            to = segment.to_type(),
            children = report.children_loaded,
            "single item loaded"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use navload_proto::{NavExpr, Value};

    use super::*;
    use crate::catalog::{Catalog, EntityDef, RelationDef, SchemaBundle};
    use crate::entity::Entity;
    use crate::path::PathResolver;
    use crate::query::MemorySource;

    fn setup() -> (Catalog, MemorySource) {
        let catalog = Catalog::with_schema(
            SchemaBundle::new(0)
                .with_entity(EntityDef::new("A", "id"))
                .with_entity(EntityDef::new("B", "id").with_field("a_id"))
                .with_entity(EntityDef::new("C", "id").with_field("b_id"))
                .with_relation(RelationDef::one_to_many("bs", "A", "id", "B", "a_id"))
                .with_relation(RelationDef::one_to_many("cs", "B", "id", "C", "b_id")),
        );
        let source = MemorySource::new().with_rows([
            Entity::new("B").with_field("id", 10i64).with_field("a_id", 1i64),
            Entity::new("B").with_field("id", 11i64).with_field("a_id", 1i64),
            Entity::new("C").with_field("id", 100i64).with_field("b_id", 10i64),
        ]);
        (catalog, source)
    }

    #[test]
    fn test_loads_first_hop_only() {
        let (catalog, source) = setup();
        let config = LoaderConfig::default();
        let chain = PathResolver::new(&catalog)
            .resolve(
                "A",
                "C",
                &NavExpr::member("bs").select_many(NavExpr::member("cs")),
            )
            .unwrap();

        let parent = EntityRef::new(Entity::new("A").with_field("id", 1i64));
        let report = SingleItemLoader::new(&source, &config)
            .load_one(Some(&parent), &chain)
            .unwrap();

        let bs = parent.collection("bs").unwrap();
        assert_eq!(bs.len(), 2);
        assert!(bs.iter().all(|b| !b.is_loaded("cs")));
        assert_eq!(report.queries_issued, 1);
        assert_eq!(source.query_count(), 1);
    }

    #[test]
    fn test_absent_parent_is_noop() {
        let (catalog, source) = setup();
        let config = LoaderConfig::default();
        let chain = PathResolver::new(&catalog)
            .resolve("A", "B", &NavExpr::member("bs"))
            .unwrap();

        let report = SingleItemLoader::new(&source, &config)
            .load_one(None, &chain)
            .unwrap();
        assert_eq!(report, LoadReport::default());
        assert_eq!(source.query_count(), 0);
    }

    #[test]
    fn test_no_children_and_null_key() {
        let (catalog, source) = setup();
        let config = LoaderConfig::default();
        let chain = PathResolver::new(&catalog)
            .resolve("A", "B", &NavExpr::member("bs"))
            .unwrap();
        let loader = SingleItemLoader::new(&source, &config);

        let lonely = EntityRef::new(Entity::new("A").with_field("id", 7i64));
        loader.load_one(Some(&lonely), &chain).unwrap();
        assert_eq!(lonely.collection("bs").map(|c| c.len()), Some(0));

        let keyless = EntityRef::new(Entity::new("A").with_field("id", Value::Null));
        let report = loader.load_one(Some(&keyless), &chain).unwrap();
        assert_eq!(keyless.collection("bs").map(|c| c.len()), Some(0));
        assert_eq!(report.queries_issued, 0);
    }
}
