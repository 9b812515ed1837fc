//! Optional cache of resolved navigation chains.
//!
//! Resolution is cheap next to the queries it saves, so the cache is off by
//! default. When enabled it is keyed by the full navigation AST (including
//! filter literals) and invalidated whenever the schema version changes.
//! Entries are bucketed by a 64-bit fingerprint but keep their request, so
//! a fingerprint collision is a miss, never another request's chain.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use dashmap::DashMap;
use navload_proto::{FilterExpr, NavArg, NavExpr, NavigationDescription, Value};
use tracing::debug;

use super::NavigationChain;

/// Cache key for a resolved chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ChainFingerprint {
    hash: u64,
}

impl ChainFingerprint {
    /// Fingerprint a navigation request.
    ///
    /// Two requests share a fingerprint only if root type, leaf type and the
    /// whole selector, literal values included, are the same.
    pub fn compute(root_type: &str, leaf_type: &str, body: &NavExpr) -> Self {
        let mut hasher = DefaultHasher::new();
        root_type.hash(&mut hasher);
        leaf_type.hash(&mut hasher);
        Self::hash_expr(body, &mut hasher);
        Self {
            hash: hasher.finish(),
        }
    }

    /// Raw hash value.
    pub fn value(&self) -> u64 {
        self.hash
    }

    fn hash_expr<H: Hasher>(expr: &NavExpr, hasher: &mut H) {
        std::mem::discriminant(expr).hash(hasher);
        match expr {
            NavExpr::Member { property } => property.hash(hasher),
            NavExpr::Call {
                method,
                source,
                args,
            } => {
                method.hash(hasher);
                Self::hash_expr(source, hasher);
                args.len().hash(hasher);
                for arg in args {
                    std::mem::discriminant(arg).hash(hasher);
                    match arg {
                        NavArg::Predicate(filter) => Self::hash_filter(filter, hasher),
                        NavArg::Key(field) => field.hash(hasher),
                        NavArg::Selector(inner) => Self::hash_expr(inner, hasher),
                    }
                }
            }
        }
    }

    fn hash_filter<H: Hasher>(filter: &FilterExpr, hasher: &mut H) {
        std::mem::discriminant(filter).hash(hasher);
        match filter {
            FilterExpr::Eq { field, value }
            | FilterExpr::Ne { field, value }
            | FilterExpr::Lt { field, value }
            | FilterExpr::Le { field, value }
            | FilterExpr::Gt { field, value }
            | FilterExpr::Ge { field, value } => {
                field.hash(hasher);
                Self::hash_value(value, hasher);
            }
            FilterExpr::In { field, values } => {
                field.hash(hasher);
                values.len().hash(hasher);
                for value in values {
                    Self::hash_value(value, hasher);
                }
            }
            FilterExpr::IsNull { field } | FilterExpr::IsNotNull { field } => field.hash(hasher),
            FilterExpr::Like { field, pattern } => {
                field.hash(hasher);
                pattern.hash(hasher);
            }
            FilterExpr::And(filters) | FilterExpr::Or(filters) => {
                filters.len().hash(hasher);
                for f in filters {
                    Self::hash_filter(f, hasher);
                }
            }
            FilterExpr::Not(inner) => Self::hash_filter(inner, hasher),
        }
    }

    fn hash_value<H: Hasher>(value: &Value, hasher: &mut H) {
        std::mem::discriminant(value).hash(hasher);
        match value {
            Value::Null => {}
            Value::Bool(b) => b.hash(hasher),
            Value::Int32(i) => i.hash(hasher),
            Value::Int64(i) | Value::Timestamp(i) => i.hash(hasher),
            Value::Float32(f) => f.to_bits().hash(hasher),
            Value::Float64(f) => f.to_bits().hash(hasher),
            Value::String(s) => s.hash(hasher),
            Value::Bytes(b) => b.hash(hasher),
            Value::Uuid(u) => u.hash(hasher),
        }
    }
}

/// Cached chain with metadata.
#[derive(Debug)]
struct CachedChain {
    request: NavigationDescription,
    chain: Arc<NavigationChain>,
    schema_version: u64,
    hit_count: AtomicU64,
}

impl CachedChain {
    fn answers(&self, root_type: &str, leaf_type: &str, body: &NavExpr) -> bool {
        self.request.root_type == root_type
            && self.request.leaf_type == leaf_type
            && self.request.body == *body
    }

    fn record_hit(&self) -> u64 {
        self.hit_count.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }

    fn hits(&self) -> u64 {
        self.hit_count.load(AtomicOrdering::Relaxed)
    }
}

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    /// Get hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }

    /// Get miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }

    /// Get eviction count.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(AtomicOrdering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Bounded, thread-safe cache of resolved chains.
pub struct ResolutionCache {
    entries: DashMap<ChainFingerprint, CachedChain>,
    max_entries: usize,
    current_schema_version: AtomicU64,
    stats: CacheStats,
}

impl ResolutionCache {
    /// Create a cache holding at most `max_entries` chains.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            current_schema_version: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    /// Get the chain cached for this request under `schema_version`.
    ///
    /// A newer schema version drops every cached chain.
    pub fn get(
        &self,
        root_type: &str,
        leaf_type: &str,
        body: &NavExpr,
        schema_version: u64,
    ) -> Option<Arc<NavigationChain>> {
        let fingerprint = ChainFingerprint::compute(root_type, leaf_type, body);
        self.get_at(&fingerprint, root_type, leaf_type, body, schema_version)
    }

    fn get_at(
        &self,
        fingerprint: &ChainFingerprint,
        root_type: &str,
        leaf_type: &str,
        body: &NavExpr,
        schema_version: u64,
    ) -> Option<Arc<NavigationChain>> {
        self.observe_version(schema_version);

        if let Some(cached) = self.entries.get(fingerprint) {
            if cached.schema_version == schema_version
                && cached.answers(root_type, leaf_type, body)
            {
                cached.record_hit();
                self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
                return Some(Arc::clone(&cached.chain));
            }
        }

        self.stats.misses.fetch_add(1, AtomicOrdering::Relaxed);
        None
    }

    /// Cache the chain resolved for this request. Evicts the least-used
    /// entry when full.
    pub fn insert(
        &self,
        root_type: &str,
        leaf_type: &str,
        body: &NavExpr,
        chain: Arc<NavigationChain>,
        schema_version: u64,
    ) {
        let fingerprint = ChainFingerprint::compute(root_type, leaf_type, body);
        let request = NavigationDescription::new(root_type, leaf_type, body.clone());
        self.insert_at(fingerprint, request, chain, schema_version);
    }

    fn insert_at(
        &self,
        fingerprint: ChainFingerprint,
        request: NavigationDescription,
        chain: Arc<NavigationChain>,
        schema_version: u64,
    ) {
        self.observe_version(schema_version);
        if schema_version < self.current_schema_version.load(AtomicOrdering::SeqCst) {
            return;
        }

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&fingerprint) {
            self.evict_least_used();
        }

        self.entries.insert(
            fingerprint,
            CachedChain {
                request,
                chain,
                schema_version,
                hit_count: AtomicU64::new(0),
            },
        );
    }

    /// Drop every cached chain and adopt a new schema version.
    pub fn invalidate(&self, new_schema_version: u64) {
        self.current_schema_version
            .store(new_schema_version, AtomicOrdering::SeqCst);
        self.entries.clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of cached chains.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn observe_version(&self, schema_version: u64) {
        let previous = self
            .current_schema_version
            .fetch_max(schema_version, AtomicOrdering::SeqCst);
        if schema_version > previous {
            debug!(
                from = previous,
                to = schema_version,
                dropped = self.entries.len(),
                "schema version changed, clearing resolution cache"
            );
            self.entries.clear();
        }
    }

    fn evict_least_used(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().hits())
            .map(|entry| *entry.key());

        if let Some(key) = victim {
            self.entries.remove(&key);
            self.stats.evictions.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("len", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("stats", &self.stats)
            .finish()
    }
}
