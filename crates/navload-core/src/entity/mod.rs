//! Entity records handled by the loaders.
//!
//! Entities are dynamic rows: a type name, ordered scalar fields, and the
//! relationship collections the loaders hydrate. [`EntityRef`] is the shared
//! handle the query source returns and the loaders mutate in place.

mod key;
mod record;

pub use key::KeyValue;
pub use record::{Entity, EntityRef};
