//! The query source capability and the queries the loaders issue.
//!
//! The loaders never talk to a database directly. They build an
//! [`EntityQuery`] (an entity set plus compositional operations) and hand it
//! to a [`QuerySource`], which materializes the matching entities.

mod filter;
mod memory;

use std::sync::Arc;

use navload_proto::{FilterExpr, OrderSpec};

use crate::entity::EntityRef;
use crate::modifier::Modifier;

pub use filter::{extract_filter_fields, FilterEvaluator};
pub use memory::{DEFAULT_QUERY_LOG_CAPACITY, MemorySource, MemorySourceError};

/// Error type reported by query sources. Kept opaque and propagated as-is.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Executes entity queries.
pub trait QuerySource: Send + Sync {
    /// Run `query` and return the materialized result entities.
    fn execute(&self, query: &EntityQuery) -> Result<Vec<EntityRef>, SourceError>;
}

impl<T: QuerySource + ?Sized> QuerySource for &T {
    fn execute(&self, query: &EntityQuery) -> Result<Vec<EntityRef>, SourceError> {
        (**self).execute(query)
    }
}

impl<T: QuerySource + ?Sized> QuerySource for Arc<T> {
    fn execute(&self, query: &EntityQuery) -> Result<Vec<EntityRef>, SourceError> {
        (**self).execute(query)
    }
}

/// Relationship flat-map: replace each `from_entity` row by the
/// `to_entity` rows whose `foreign_key_field` equals its `key_field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationStep {
    pub from_entity: String,
    pub to_entity: String,
    /// Navigation property being expanded.
    pub property: String,
    /// Key field on `from_entity`.
    pub key_field: String,
    /// Foreign-key field on `to_entity`.
    pub foreign_key_field: String,
}

/// One compositional operation of an [`EntityQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOp {
    /// Filter or sort the current sequence.
    Modify(Modifier),
    /// Navigate to the related entity set.
    FlatMap(RelationStep),
}

/// A typed entity-set handle plus the operations applied to it, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    /// Entity set the query starts from.
    pub entity_type: String,
    /// Operations applied left to right.
    pub ops: Vec<QueryOp>,
}

impl EntityQuery {
    /// Query every entity of a type.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            ops: Vec::new(),
        }
    }

    /// Append a `Where` filter.
    pub fn filter(self, filter: FilterExpr) -> Self {
        self.with_modifier(Modifier::Where(filter))
    }

    /// Append a fresh primary ordering.
    pub fn order_by(self, spec: OrderSpec) -> Self {
        self.with_modifier(Modifier::OrderBy(spec))
    }

    /// Append a tie-breaking ordering.
    pub fn then_by(self, spec: OrderSpec) -> Self {
        self.with_modifier(Modifier::ThenBy(spec))
    }

    /// Append a modifier.
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.push(modifier);
        self
    }

    /// Append a modifier in place.
    pub fn push(&mut self, modifier: Modifier) {
        self.ops.push(QueryOp::Modify(modifier));
    }

    /// Append a relationship flat-map.
    pub fn flat_map(mut self, step: RelationStep) -> Self {
        self.ops.push(QueryOp::FlatMap(step));
        self
    }

    /// Entity type of the rows this query yields.
    pub fn result_type(&self) -> &str {
        self.ops
            .iter()
            .rev()
            .find_map(|op| match op {
                QueryOp::FlatMap(step) => Some(step.to_entity.as_str()),
                QueryOp::Modify(_) => None,
            })
            .unwrap_or(self.entity_type.as_str())
    }

    /// The same query without orderings.
    ///
    /// A frontier only feeds the next hop's flat-map, so its order is
    /// irrelevant; its filters still decide membership.
    pub fn frontier_query(&self) -> EntityQuery {
        EntityQuery {
            entity_type: self.entity_type.clone(),
            ops: self
                .ops
                .iter()
                .filter(|op| match op {
                    QueryOp::Modify(m) => m.is_filter(),
                    QueryOp::FlatMap(_) => true,
                })
                .cloned()
                .collect(),
        }
    }

    /// Number of relationship flat-maps in the query.
    pub fn hop_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, QueryOp::FlatMap(_)))
            .count()
    }
}
