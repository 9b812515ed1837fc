//! Schema metadata and the schema lookup capability.
//!
//! [`SchemaLookup`] is what the path resolver consults; [`Catalog`] is an
//! in-memory, versioned implementation of it built from a [`SchemaBundle`].

mod catalog;
mod entity;
mod lookup;
mod relation;
mod schema;

pub use catalog::Catalog;
pub use entity::EntityDef;
pub use lookup::{FieldRef, LookupError, PropertyRef, SchemaLookup};
pub use relation::RelationDef;
pub use schema::SchemaBundle;
