//! Loader configuration.

/// Budget limits that stop runaway loads.
///
/// The default budget is unlimited. Limits are opt-in through
/// [`LoadBudget::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBudget {
    /// Maximum number of hops in a resolved chain.
    pub max_depth: usize,
    /// Maximum number of children a single hop query may return.
    pub max_entities_per_hop: usize,
}

impl Default for LoadBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl LoadBudget {
    /// Create a budget with custom limits.
    pub fn new(max_depth: usize, max_entities_per_hop: usize) -> Self {
        Self {
            max_depth,
            max_entities_per_hop,
        }
    }

    /// Create an unlimited budget.
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            max_entities_per_hop: usize::MAX,
        }
    }
}

/// Configuration for [`Loader`](crate::Loader).
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Depth and fan-out limits.
    pub budget: LoadBudget,

    /// Append hop modifiers to the source query. When false, children are
    /// fetched unfiltered and modifiers run in memory; results are identical.
    pub modifier_pushdown: bool,

    /// Stop cascading as soon as a hop has no parents, without querying.
    pub skip_empty_frontier: bool,

    /// Capacity of the resolution cache. None disables caching, so every
    /// call re-derives its chain from the schema.
    pub resolution_cache: Option<usize>,

    /// Load independent include chains of one root query on scoped threads.
    pub parallel_chains: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            budget: LoadBudget::default(),
            modifier_pushdown: true,
            skip_empty_frontier: true,
            resolution_cache: None,
            parallel_chains: false,
        }
    }
}

impl LoaderConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the budget.
    pub fn budget(mut self, budget: LoadBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Enable or disable modifier pushdown.
    pub fn modifier_pushdown(mut self, enabled: bool) -> Self {
        self.modifier_pushdown = enabled;
        self
    }

    /// Enable or disable the empty-frontier short circuit.
    pub fn skip_empty_frontier(mut self, enabled: bool) -> Self {
        self.skip_empty_frontier = enabled;
        self
    }

    /// Enable the resolution cache with the given capacity.
    pub fn with_resolution_cache(mut self, capacity: usize) -> Self {
        self.resolution_cache = Some(capacity);
        self
    }

    /// Enable or disable parallel include chains.
    pub fn parallel_chains(mut self, enabled: bool) -> Self {
        self.parallel_chains = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert!(config.modifier_pushdown);
        assert!(config.skip_empty_frontier);
        assert!(config.resolution_cache.is_none());
        assert!(!config.parallel_chains);
        assert_eq!(config.budget, LoadBudget::unlimited());
        assert_eq!(config.budget.max_entities_per_hop, usize::MAX);
    }

    #[test]
    fn test_builder() {
        let config = LoaderConfig::new()
            .budget(LoadBudget::new(2, 10))
            .modifier_pushdown(false)
            .with_resolution_cache(64)
            .parallel_chains(true);

        assert_eq!(config.budget, LoadBudget::new(2, 10));
        assert!(!config.modifier_pushdown);
        assert_eq!(config.resolution_cache, Some(64));
        assert!(config.parallel_chains);
    }
}
