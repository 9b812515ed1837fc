//! Entity definitions.

use serde::{Deserialize, Serialize};

/// An entity definition (table schema).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within schema).
    pub name: String,
    /// Key fields. Loading only supports entities with exactly one.
    pub key_fields: Vec<String>,
    /// Scalar field names.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl EntityDef {
    /// Create an entity with a single key field.
    pub fn new(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        let key_field = key_field.into();
        Self {
            name: name.into(),
            fields: vec![key_field.clone()],
            key_fields: vec![key_field],
        }
    }

    /// Create an entity keyed by several fields.
    pub fn with_composite_key(name: impl Into<String>, key_fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields: key_fields.clone(),
            key_fields,
        }
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.has_field(&field) {
            self.fields.push(field);
        }
        self
    }

    /// Add multiple fields.
    pub fn with_fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields.into_iter().fold(self, |entity, f| entity.with_field(f))
    }

    /// Check whether a field is declared.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Whether the entity is keyed by more than one field.
    pub fn has_composite_key(&self) -> bool {
        self.key_fields.len() > 1
    }
}
