//! Navigation path resolution.
//!
//! The [`PathResolver`] turns a navigation selector into a
//! [`NavigationChain`]: one accessor-bound [`PathSegment`] per hop, validated
//! against the schema before any query runs.

mod cache;
mod resolver;
mod segment;

pub use cache::{CacheStats, ChainFingerprint, ResolutionCache};
pub use resolver::PathResolver;
pub use segment::{ChildSetter, KeyAccessor, NavigationChain, PathSegment};
