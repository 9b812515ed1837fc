//! Caller-facing include entry points.

use std::sync::Arc;
use std::time::Instant;

use navload_proto::NavigationDescription;
use tracing::{info, instrument};

use crate::catalog::SchemaLookup;
use crate::entity::EntityRef;
use crate::error::{ConfigError, Error};
use crate::path::NavigationChain;
use crate::query::{EntityQuery, QuerySource};

use super::report::LoadReport;
use super::{BatchLoader, Loader, SingleItemLoader};

/// Decorate `root_query` so that executing it also hydrates `description`.
pub fn include_chain(
    root_query: EntityQuery,
    description: NavigationDescription,
) -> IncludeQuery {
    IncludeQuery {
        root_query,
        includes: vec![description],
    }
}

/// A root query plus the navigation chains to hydrate on its results.
///
/// Chains are independent of each other. When two chains assign the same
/// collection, the later chain's assignment wins.
#[derive(Debug, Clone)]
pub struct IncludeQuery {
    root_query: EntityQuery,
    includes: Vec<NavigationDescription>,
}

impl IncludeQuery {
    /// Add another chain.
    pub fn include(mut self, description: NavigationDescription) -> Self {
        self.includes.push(description);
        self
    }

    /// The undecorated root query.
    pub fn root_query(&self) -> &EntityQuery {
        &self.root_query
    }

    /// Navigation descriptions, in declaration order.
    pub fn includes(&self) -> &[NavigationDescription] {
        &self.includes
    }

    /// Resolve every chain without running any query.
    pub fn resolve(
        &self,
        loader: &Loader,
        schema: &dyn SchemaLookup,
    ) -> Result<Vec<Arc<NavigationChain>>, Error> {
        let root_type = self.root_query.result_type();
        self.includes
            .iter()
            .map(|description| -> Result<Arc<NavigationChain>, Error> {
                if description.root_type != root_type {
                    return Err(ConfigError::RootTypeMismatch {
                        expected: description.root_type.clone(),
                        actual: root_type.to_string(),
                    }
                    .into());
                }
                loader.resolve(schema, description)
            })
            .collect()
    }

    /// Materialize the root query, then batch-load every chain onto it.
    pub fn execute(
        &self,
        loader: &Loader,
        source: &dyn QuerySource,
        schema: &dyn SchemaLookup,
    ) -> Result<Vec<EntityRef>, Error> {
        self.execute_with_report(loader, source, schema)
            .map(|(roots, _)| roots)
    }

    /// [`execute`](Self::execute), also returning what the load did.
    ///
    /// Every chain is resolved before the root query runs, so a
    /// configuration error leaves the source untouched.
    #[instrument(
        skip_all,
        fields(root = %self.root_query.entity_type, chains = self.includes.len())
    )]
    pub fn execute_with_report(
        &self,
        loader: &Loader,
        source: &dyn QuerySource,
        schema: &dyn SchemaLookup,
    ) -> Result<(Vec<EntityRef>, LoadReport), Error> {
        let chains = self.resolve(loader, schema)?;

        let started = Instant::now();
        let roots = source.execute(&self.root_query).map_err(Error::Query)?;
        let mut report = LoadReport {
            queries_issued: 1,
            ..LoadReport::default()
        };

        let batch = BatchLoader::new(source, loader.config());
        let chain_reports = if loader.config().parallel_chains && chains.len() > 1 {
            self.load_chains_parallel(batch, &roots, &chains)
        } else {
            chains
                .iter()
                .map(|chain| batch.load_many(&self.root_query, &roots, chain))
                .collect()
        };
        for chain_report in chain_reports {
            report.merge(&chain_report?);
        }
        report.duration = started.elapsed();

        info!(
            roots = roots.len(),
            queries = report.queries_issued,
            hydrated = report.entities_hydrated,
            duration_ms = report.duration.as_millis() as u64,
            "include query executed"
        );
        Ok((roots, report))
    }

    /// Run every chain on its own scoped thread with its own parent list.
    fn load_chains_parallel(
        &self,
        batch: BatchLoader<'_>,
        roots: &[EntityRef],
        chains: &[Arc<NavigationChain>],
    ) -> Vec<Result<LoadReport, Error>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = chains
                .iter()
                .map(|chain| {
                    let parents = roots.to_vec();
                    let root_query = &self.root_query;
                    scope.spawn(move || batch.load_many(root_query, &parents, chain))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    /// Hydrate the first hop of every chain on a single entity.
    pub fn load_one(
        &self,
        loader: &Loader,
        entity: Option<&EntityRef>,
        source: &dyn QuerySource,
        schema: &dyn SchemaLookup,
    ) -> Result<LoadReport, Error> {
        let chains = self.resolve(loader, schema)?;
        let single = SingleItemLoader::new(source, loader.config());

        let mut report = LoadReport::default();
        for chain in &chains {
            report.merge(&single.load_one(entity, chain)?);
        }
        Ok(report)
    }
}
