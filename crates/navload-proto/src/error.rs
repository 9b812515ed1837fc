//! IR error types.

use thiserror::Error;

/// Errors raised while moving IR across a process boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Encoding a description failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// The input was not a well-formed description.
    #[error("decode error: {0}")]
    Decode(String),
}
