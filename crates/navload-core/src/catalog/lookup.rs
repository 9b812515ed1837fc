//! The schema lookup capability consulted at path-resolution time.

use thiserror::Error;

/// A field on an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Owning entity type.
    pub entity: String,
    /// Field name.
    pub field: String,
}

impl FieldRef {
    /// Create a field reference.
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
        }
    }
}

/// A collection navigation property on the "one" side of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    /// Entity type declaring the property.
    pub owner: String,
    /// Property name.
    pub name: String,
    /// Entity type of the collection elements.
    pub target: String,
    /// Field on `owner` the relationship references.
    pub key_field: String,
    /// Foreign-key field on `target`.
    pub foreign_key_field: String,
    /// Whether the property can be assigned.
    pub writable: bool,
}

/// Schema lookup failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The entity type is not part of the schema.
    #[error("unknown entity type '{0}'")]
    UnknownEntity(String),

    /// The entity has no such navigation property.
    #[error("entity '{entity}' has no navigation property '{property}'")]
    UnknownProperty { entity: String, property: String },

    /// The entity declares no key field.
    #[error("entity '{0}' declares no key field")]
    NoKey(String),

    /// No foreign key on `many_side` references `one_side`.
    #[error("no foreign key on '{many_side}' references '{one_side}'")]
    NoForeignKey { many_side: String, one_side: String },

    /// More than one relation connects the two types.
    #[error("{count} relations connect '{one_side}' to '{many_side}'")]
    AmbiguousRelation {
        one_side: String,
        many_side: String,
        count: usize,
    },
}

/// Answers the questions the path resolver needs about the entity model.
///
/// Implementations are queried on every resolution; the core never caches
/// answers unless a resolution cache is explicitly configured, and then
/// invalidates on [`schema_version`](SchemaLookup::schema_version) changes.
pub trait SchemaLookup: Send + Sync {
    /// Key fields of an entity type.
    fn key_fields_of(&self, entity_type: &str) -> Result<Vec<FieldRef>, LookupError>;

    /// Foreign-key field on `many_side` that references `one_side`.
    fn foreign_key_field_of(&self, many_side: &str, one_side: &str)
        -> Result<FieldRef, LookupError>;

    /// Collection property on `one_side` holding `many_side` children.
    fn navigation_property_of(
        &self,
        one_side: &str,
        many_side: &str,
    ) -> Result<PropertyRef, LookupError>;

    /// Resolve a member access on `entity_type` to its navigation property.
    fn property_of(&self, entity_type: &str, property: &str) -> Result<PropertyRef, LookupError>;

    /// Whether `entity_type` declares `field`. Lookups without field
    /// metadata accept everything.
    fn has_field(&self, _entity_type: &str, _field: &str) -> Result<bool, LookupError> {
        Ok(true)
    }

    /// Version of the answers above; changes invalidate cached chains.
    fn schema_version(&self) -> u64 {
        0
    }
}

impl<T: SchemaLookup + ?Sized> SchemaLookup for &T {
    fn key_fields_of(&self, entity_type: &str) -> Result<Vec<FieldRef>, LookupError> {
        (**self).key_fields_of(entity_type)
    }

    fn foreign_key_field_of(
        &self,
        many_side: &str,
        one_side: &str,
    ) -> Result<FieldRef, LookupError> {
        (**self).foreign_key_field_of(many_side, one_side)
    }

    fn navigation_property_of(
        &self,
        one_side: &str,
        many_side: &str,
    ) -> Result<PropertyRef, LookupError> {
        (**self).navigation_property_of(one_side, many_side)
    }

    fn property_of(&self, entity_type: &str, property: &str) -> Result<PropertyRef, LookupError> {
        (**self).property_of(entity_type, property)
    }

    fn has_field(&self, entity_type: &str, field: &str) -> Result<bool, LookupError> {
        (**self).has_field(entity_type, field)
    }

    fn schema_version(&self) -> u64 {
        (**self).schema_version()
    }
}
