//! In-memory query source.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::entity::{Entity, EntityRef, KeyValue};
use crate::modifier::{Modifier, ModifierApplier};

use super::{EntityQuery, QueryOp, QuerySource, SourceError};

/// Errors raised by [`MemorySource`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MemorySourceError {
    /// No rows were ever registered for the entity set.
    #[error("unknown entity set '{0}'")]
    UnknownEntitySet(String),

    /// A flat-map expects a different current entity type.
    #[error("flat-map expects rows of '{expected}' but the query yields '{actual}'")]
    FlatMapTypeMismatch { expected: String, actual: String },
}

/// Number of executed queries [`MemorySource`] keeps by default.
pub const DEFAULT_QUERY_LOG_CAPACITY: usize = 1024;

/// A thread-safe table-per-entity-type query source.
///
/// Every execution returns fresh [`EntityRef`]s, so hydrating results never
/// alters the stored rows. Every execution is counted. The most recent
/// queries are logged for inspection, up to the log capacity.
pub struct MemorySource {
    tables: RwLock<HashMap<String, Vec<Entity>>>,
    executed: Mutex<VecDeque<EntityQuery>>,
    log_capacity: usize,
    query_count: AtomicU64,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self {
            tables: RwLock::default(),
            executed: Mutex::default(),
            log_capacity: DEFAULT_QUERY_LOG_CAPACITY,
            query_count: AtomicU64::new(0),
        }
    }
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity set with no rows.
    pub fn register(&self, entity_type: impl Into<String>) {
        self.tables.write().entry(entity_type.into()).or_default();
    }

    /// Insert one row into its entity set.
    pub fn insert(&self, entity: Entity) {
        self.tables
            .write()
            .entry(entity.entity_type().to_string())
            .or_default()
            .push(entity);
    }

    /// Insert many rows.
    pub fn insert_all(&self, entities: impl IntoIterator<Item = Entity>) {
        let mut tables = self.tables.write();
        for entity in entities {
            tables
                .entry(entity.entity_type().to_string())
                .or_default()
                .push(entity);
        }
    }

    /// Keep at most `capacity` executed queries, dropping the oldest.
    /// Zero disables the log; counting is unaffected.
    pub fn with_query_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self.executed.get_mut().truncate(capacity);
        self
    }

    /// Builder-style [`insert_all`](Self::insert_all).
    pub fn with_rows(self, entities: impl IntoIterator<Item = Entity>) -> Self {
        self.insert_all(entities);
        self
    }

    /// Number of stored rows of an entity type.
    pub fn len(&self, entity_type: &str) -> usize {
        self.tables.read().get(entity_type).map_or(0, Vec::len)
    }

    /// Whether no rows of an entity type are stored.
    pub fn is_empty(&self, entity_type: &str) -> bool {
        self.len(entity_type) == 0
    }

    /// Number of queries executed so far.
    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Copy of the logged queries, oldest first.
    pub fn executed_queries(&self) -> Vec<EntityQuery> {
        self.executed.lock().iter().cloned().collect()
    }

    /// Reset the query counter and log.
    pub fn reset_stats(&self) {
        self.query_count.store(0, Ordering::SeqCst);
        self.executed.lock().clear();
    }

    fn run(&self, query: &EntityQuery) -> Result<Vec<EntityRef>, MemorySourceError> {
        let tables = self.tables.read();
        let table = |name: &str| {
            tables
                .get(name)
                .ok_or_else(|| MemorySourceError::UnknownEntitySet(name.to_string()))
        };

        let mut current_type = query.entity_type.as_str();
        let mut rows: Vec<&Entity> = table(current_type)?.iter().collect();
        let mut pending: Vec<Modifier> = Vec::new();

        for op in &query.ops {
            match op {
                QueryOp::Modify(modifier) => pending.push(modifier.clone()),
                QueryOp::FlatMap(step) => {
                    if step.from_entity != current_type {
                        return Err(MemorySourceError::FlatMapTypeMismatch {
                            expected: step.from_entity.clone(),
                            actual: current_type.to_string(),
                        });
                    }
                    rows = ModifierApplier::apply_in_memory(rows, &pending);
                    pending.clear();

                    let keys: HashSet<KeyValue> = rows
                        .iter()
                        .filter_map(|row| row.get(&step.key_field))
                        .filter_map(KeyValue::from_value)
                        .collect();

                    rows = table(&step.to_entity)?
                        .iter()
                        .filter(|child| {
                            child
                                .get(&step.foreign_key_field)
                                .and_then(KeyValue::from_value)
                                .is_some_and(|fk| keys.contains(&fk))
                        })
                        .collect();
                    current_type = step.to_entity.as_str();
                }
            }
        }

        Ok(ModifierApplier::apply_in_memory(rows, &pending)
            .into_iter()
            .map(|row| EntityRef::new(row.clone()))
            .collect())
    }
}

impl QuerySource for MemorySource {
    fn execute(&self, query: &EntityQuery) -> Result<Vec<EntityRef>, SourceError> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        if self.log_capacity > 0 {
            let mut executed = self.executed.lock();
            if executed.len() == self.log_capacity {
                executed.pop_front();
            }
            executed.push_back(query.clone());
        }
        self.run(query).map_err(Into::into)
    }
}
