//! Core error types.

use thiserror::Error;

use crate::catalog::LookupError;
use crate::query::SourceError;

/// Loader errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The navigation path cannot be resolved into a loadable chain.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The schema lookup capability could not answer a request.
    #[error("schema lookup failed: {0}")]
    SchemaLookup(#[from] LookupError),

    /// The query source failed; the source error is kept as-is.
    #[error("query source error: {0}")]
    Query(#[source] SourceError),

    /// A hop materialized more entities than the configured budget allows.
    #[error("load budget exceeded: {0}")]
    BudgetExceeded(String),

    /// A schema bundle could not be decoded or encoded.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// IR error.
    #[error("navigation IR error: {0}")]
    Proto(#[from] navload_proto::Error),
}

/// Fatal configuration problems, raised before any query executes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An entity in the chain declares more than one key field.
    #[error("multiple keys not supported: entity '{entity}' declares {count} key fields")]
    CompositeKey { entity: String, count: usize },

    /// No relationship maps `from` to `to`.
    #[error("no relationship mapping from '{from}' to '{to}'")]
    MissingRelationship { from: String, to: String },

    /// A modifier call the loader does not understand.
    #[error("the method '{0}' is not supported in a child collection selector")]
    UnsupportedOperation(String),

    /// A relationship references a field other than its owner's key.
    #[error("relationship '{entity}.{property}' references '{field}', not the key '{key}'")]
    KeyMismatch {
        entity: String,
        property: String,
        field: String,
        key: String,
    },

    /// The target relationship property cannot be assigned.
    #[error("relationship '{entity}.{property}' has no accessible setter")]
    MissingSetter { entity: String, property: String },

    /// The selector does not end on the declared leaf type.
    #[error("navigation ends on '{actual}' but '{expected}' was declared")]
    LeafTypeMismatch { expected: String, actual: String },

    /// The root query yields a different entity type than the chain starts from.
    #[error("root query yields '{actual}' but the chain starts from '{expected}'")]
    RootTypeMismatch { expected: String, actual: String },

    /// A modifier references a field the hop's entity does not have.
    #[error("unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    /// The selector is structurally malformed.
    #[error("invalid navigation: {0}")]
    InvalidNavigation(String),

    /// The chain is deeper than the configured budget.
    #[error("navigation depth {depth} exceeds maximum allowed depth {max}")]
    DepthExceeded { depth: usize, max: usize },
}
