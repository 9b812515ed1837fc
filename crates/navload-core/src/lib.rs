//! navload core - navigation path resolution and batched relation loading.
//!
//! Given a chained relationship selector (`User -> posts -> comments`) this
//! crate resolves it into accessor-bound [`PathSegment`]s and hydrates the
//! relationship collections of already-materialized entities with one query
//! per hop, stitching children to parents through an in-memory hash join.
//!
//! The schema catalog ([`SchemaLookup`]) and the query engine
//! ([`QuerySource`]) are capabilities supplied by the embedder; an in-memory
//! [`Catalog`] and [`MemorySource`] are provided for tests and embedding.

pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod loader;
pub mod modifier;
pub mod path;
pub mod query;

pub use catalog::{
    Catalog, EntityDef, FieldRef, LookupError, PropertyRef, RelationDef, SchemaBundle,
    SchemaLookup,
};
pub use config::{LoadBudget, LoaderConfig};
pub use entity::{Entity, EntityRef, KeyValue};
pub use error::{ConfigError, Error};
pub use loader::{
    include_chain, BatchLoader, HashJoin, IncludeQuery, LoadReport, Loader, SingleItemLoader,
};
pub use modifier::{Modifier, ModifierApplier, Row};
pub use path::{
    CacheStats, ChainFingerprint, ChildSetter, KeyAccessor, NavigationChain, PathResolver,
    PathSegment, ResolutionCache,
};
pub use query::{
    EntityQuery, FilterEvaluator, MemorySource, MemorySourceError, QueryOp, QuerySource,
    RelationStep, SourceError,
};

/// Re-export IR types.
pub use navload_proto as proto;
