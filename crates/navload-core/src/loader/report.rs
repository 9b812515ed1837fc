//! Load statistics.

use std::time::Duration;

/// What a load did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Hops whose children were fetched and assigned.
    pub hops_executed: usize,
    /// Queries sent to the query source.
    pub queries_issued: usize,
    /// Parent entities whose collection was assigned.
    pub entities_hydrated: usize,
    /// Children placed into collections, summed over all parents.
    pub children_loaded: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
}

impl LoadReport {
    /// Add another report's counters to this one. Durations are summed.
    pub fn merge(&mut self, other: &LoadReport) {
        self.hops_executed += other.hops_executed;
        self.queries_issued += other.queries_issued;
        self.entities_hydrated += other.entities_hydrated;
        self.children_loaded += other.children_loaded;
        self.duration += other.duration;
    }
}
