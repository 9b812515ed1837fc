//! Relation definitions between entities.

use serde::{Deserialize, Serialize};

/// A one-to-many relation, navigable from the "one" side.
///
/// `name` is the collection property on `from_entity`; `to_field` is the
/// foreign key on `to_entity` that references `from_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Navigation property name on the source entity.
    pub name: String,
    /// Source ("one") entity name.
    pub from_entity: String,
    /// Referenced field on the source entity (its key).
    pub from_field: String,
    /// Target ("many") entity name.
    pub to_entity: String,
    /// Foreign-key field on the target entity.
    pub to_field: String,
    /// Whether the collection property can be assigned.
    #[serde(default = "default_writable")]
    pub writable: bool,
}

fn default_writable() -> bool {
    true
}

impl RelationDef {
    /// Create a one-to-many relation.
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            writable: true,
        }
    }

    /// Mark the navigation property as read-only.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Qualified name used as the schema key (`Entity.property`).
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.from_entity, self.name)
    }

    /// Whether this relation connects `one_side` to `many_side`.
    pub fn connects(&self, one_side: &str, many_side: &str) -> bool {
        self.from_entity == one_side && self.to_entity == many_side
    }
}
