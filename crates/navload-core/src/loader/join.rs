//! Hash join between a hop's parents and its fetched children.
//!
//! Algorithm:
//! 1. Build phase: scan the children once, building `FK value -> children`
//! 2. Probe phase: for each parent key, look up its children in O(1)
//!
//! Complexity: O(N + M) where N = parent count, M = child count

use std::collections::HashMap;

use crate::entity::{EntityRef, KeyValue};
use crate::path::KeyAccessor;

/// Children of one hop, bucketed by foreign-key value.
#[derive(Debug, Default)]
pub struct HashJoin {
    buckets: HashMap<KeyValue, Vec<EntityRef>>,
    unkeyed: usize,
}

impl HashJoin {
    /// Bucket `children` by `foreign_key`.
    ///
    /// Children keep their relative order inside a bucket. Children whose
    /// foreign key is missing, null or unhashable join no parent.
    pub fn build<'c>(
        children: impl IntoIterator<Item = &'c EntityRef>,
        foreign_key: &KeyAccessor,
    ) -> Self {
        let mut join = HashJoin::default();
        for child in children {
            match foreign_key.key_of(child) {
                Some(key) => join.buckets.entry(key).or_default().push(child.clone()),
                None => join.unkeyed += 1,
            }
        }
        join
    }

    /// Children matching a parent key. An absent key matches nothing.
    pub fn children_of(&self, key: Option<&KeyValue>) -> Vec<EntityRef> {
        key.and_then(|k| self.buckets.get(k))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of distinct foreign-key values.
    pub fn distinct_keys(&self) -> usize {
        self.buckets.len()
    }

    /// Number of children that could not be bucketed.
    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}
