//! Cascading batch loader.

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::config::LoaderConfig;
use crate::entity::EntityRef;
use crate::error::{ConfigError, Error};
use crate::modifier::ModifierApplier;
use crate::path::{ChildSetter, NavigationChain};
use crate::query::{EntityQuery, QuerySource};

use super::join::HashJoin;
use super::report::LoadReport;
use super::{check_hop_budget, distinct_by_identity, fetch_children};

/// Hydrates many parents with one query per hop.
///
/// For each hop the current frontier's children are fetched in a single
/// query (the frontier query flat-mapped over the hop's relationship),
/// bucketed by foreign key, and assigned to every distinct frontier parent
/// by key lookup. Parents without children get an empty collection. The
/// fetched children become the next hop's frontier.
///
/// Collections are assigned only after every hop has been fetched. A query
/// error or budget violation at any hop leaves all parents untouched.
#[derive(Clone, Copy)]
pub struct BatchLoader<'a> {
    source: &'a dyn QuerySource,
    config: &'a LoaderConfig,
}

impl<'a> BatchLoader<'a> {
    /// Create a batch loader.
    pub fn new(source: &'a dyn QuerySource, config: &'a LoaderConfig) -> Self {
        Self { source, config }
    }

    /// Load every hop of `chain` onto `parents`.
    ///
    /// `root_query` must be the query `parents` were materialized from; its
    /// filters are re-applied so each hop query selects children of exactly
    /// this parent set. Its orderings are dropped.
    #[instrument(skip_all, fields(chain = %chain, parents = parents.len()))]
    pub fn load_many(
        &self,
        root_query: &EntityQuery,
        parents: &[EntityRef],
        chain: &NavigationChain,
    ) -> Result<LoadReport, Error> {
        if root_query.result_type() != chain.root_type() {
            return Err(ConfigError::RootTypeMismatch {
                expected: chain.root_type().to_string(),
                actual: root_query.result_type().to_string(),
            }
            .into());
        }

        let started = Instant::now();
        let mut report = LoadReport::default();
        let mut frontier = distinct_by_identity(parents.to_vec());
        let mut base = root_query.frontier_query();
        let mut staged: Vec<(&ChildSetter, EntityRef, Vec<EntityRef>)> = Vec::new();

        for (hop, segment) in chain.segments().iter().enumerate() {
            if frontier.is_empty() && self.config.skip_empty_frontier {
                debug!(hop, remaining = chain.depth() - hop, "empty frontier, stopping");
                break;
            }

            let hop_query = base.flat_map(segment.relation_step());
            let children = fetch_children(
                self.source,
                self.config,
                hop_query.clone(),
                segment.modifiers(),
            )?;
            report.queries_issued += 1;
            check_hop_budget(self.config, hop, &segment.to_string(), children.len())?;

            let children = distinct_by_identity(children);
            let join = HashJoin::build(&children, segment.foreign_key());
            if join.unkeyed() > 0 {
                warn!(
                    hop,
                    field = segment.foreign_key().field(),
                    count = join.unkeyed(),
                    "children without a usable foreign key match no parent"
                );
            }

            let mut unkeyed_parents = 0usize;
            for parent in &frontier {
                let key = segment.primary_key().key_of(parent);
                if key.is_none() {
                    unkeyed_parents += 1;
                }
                let matched = join.children_of(key.as_ref());
                report.children_loaded += matched.len();
                staged.push((segment.setter(), parent.clone(), matched));
            }
            if unkeyed_parents > 0 {
                warn!(
                    hop,
                    field = segment.primary_key().field(),
                    count = unkeyed_parents,
                    "parents without a usable key received empty collections"
                );
            }

            debug!(
                hop,
                from = segment.from_type(),
                to = segment.to_type(),
                frontier = frontier.len(),
                children = children.len(),
                distinct_keys = join.distinct_keys(),
                "hop loaded"
            );

            report.entities_hydrated += frontier.len();
            report.hops_executed += 1;
            frontier = children;
            base = ModifierApplier::apply_filters_to_query(hop_query, segment.modifiers());
        }

        for (setter, parent, children) in staged {
            setter.assign(&parent, children);
        }

        report.duration = started.elapsed();
        info!(
            hops = report.hops_executed,
            queries = report.queries_issued,
            hydrated = report.entities_hydrated,
            duration_ms = report.duration.as_millis() as u64,
            "batch load complete"
        );
        Ok(report)
    }
}
