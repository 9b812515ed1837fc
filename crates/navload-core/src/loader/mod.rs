//! Single-item and batched relationship loading.
//!
//! Both loaders consume the same resolved [`NavigationChain`]. The
//! [`BatchLoader`] hydrates many parents with one query per hop and cascades
//! through every hop; the [`SingleItemLoader`] hydrates the first hop of one
//! parent only.

mod batch;
mod include;
mod join;
mod report;
mod single;

use std::collections::HashSet;
use std::sync::Arc;

use navload_proto::NavigationDescription;

use crate::catalog::SchemaLookup;
use crate::config::LoaderConfig;
use crate::entity::EntityRef;
use crate::error::Error;
use crate::modifier::{Modifier, ModifierApplier};
use crate::path::{NavigationChain, PathResolver, ResolutionCache};
use crate::query::{EntityQuery, QuerySource};

pub use batch::BatchLoader;
pub use include::{include_chain, IncludeQuery};
pub use join::HashJoin;
pub use report::LoadReport;
pub use single::SingleItemLoader;

/// Long-lived entry point holding configuration and the optional
/// resolution cache.
#[derive(Debug)]
pub struct Loader {
    config: LoaderConfig,
    cache: Option<ResolutionCache>,
}

impl Loader {
    /// Create a loader.
    pub fn new(config: LoaderConfig) -> Self {
        let cache = config.resolution_cache.map(ResolutionCache::new);
        Self { config, cache }
    }

    /// The loader's configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The resolution cache, if enabled.
    pub fn cache(&self) -> Option<&ResolutionCache> {
        self.cache.as_ref()
    }

    /// A resolver using this loader's budget and cache.
    pub fn resolver<'a>(&'a self, schema: &'a dyn SchemaLookup) -> PathResolver<'a> {
        let resolver = PathResolver::new(schema).with_budget(self.config.budget.clone());
        match &self.cache {
            Some(cache) => resolver.with_cache(cache),
            None => resolver,
        }
    }

    /// Resolve a navigation description.
    pub fn resolve(
        &self,
        schema: &dyn SchemaLookup,
        description: &NavigationDescription,
    ) -> Result<Arc<NavigationChain>, Error> {
        self.resolver(schema).resolve_description(description)
    }

    /// Batch-load `chain` onto `parents`, the materialized results of
    /// `root_query`.
    pub fn load_many(
        &self,
        source: &dyn QuerySource,
        root_query: &EntityQuery,
        parents: &[EntityRef],
        chain: &NavigationChain,
    ) -> Result<LoadReport, Error> {
        BatchLoader::new(source, &self.config).load_many(root_query, parents, chain)
    }

    /// Load the first hop of `chain` onto a single parent.
    pub fn load_one(
        &self,
        source: &dyn QuerySource,
        parent: Option<&EntityRef>,
        chain: &NavigationChain,
    ) -> Result<LoadReport, Error> {
        SingleItemLoader::new(source, &self.config).load_one(parent, chain)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

/// Run a hop query, applying `modifiers` at the source or in memory.
fn fetch_children(
    source: &dyn QuerySource,
    config: &LoaderConfig,
    query: EntityQuery,
    modifiers: &[Modifier],
) -> Result<Vec<EntityRef>, Error> {
    if config.modifier_pushdown {
        let query = ModifierApplier::apply_to_query(query, modifiers);
        source.execute(&query).map_err(Error::Query)
    } else {
        let rows = source.execute(&query).map_err(Error::Query)?;
        Ok(ModifierApplier::apply_in_memory(rows, modifiers))
    }
}

/// Check a hop's result size against the budget.
fn check_hop_budget(
    config: &LoaderConfig,
    hop: usize,
    path: &str,
    fetched: usize,
) -> Result<(), Error> {
    let max = config.budget.max_entities_per_hop;
    if fetched > max {
        return Err(Error::BudgetExceeded(format!(
            "hop {hop} ({path}) materialized {fetched} entities, limit is {max}"
        )));
    }
    Ok(())
}

/// Drop repeated handles, keeping first occurrences in order.
fn distinct_by_identity(entities: Vec<EntityRef>) -> Vec<EntityRef> {
    let mut seen = HashSet::with_capacity(entities.len());
    entities
        .into_iter()
        .filter(|entity| seen.insert(entity.identity()))
        .collect()
}
