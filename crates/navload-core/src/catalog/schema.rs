//! Schema bundle - versioned snapshot of the entity model.

use super::{EntityDef, RelationDef};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A versioned snapshot of the entity model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version (monotonically increasing once applied to a catalog).
    #[serde(default)]
    pub version: u64,
    /// Entity definitions keyed by name.
    #[serde(default)]
    pub entities: BTreeMap<String, EntityDef>,
    /// Relation definitions keyed by qualified name (`Entity.property`).
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.insert(relation.qualified_name(), relation);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get the relation behind a navigation property.
    pub fn get_relation(&self, entity: &str, property: &str) -> Option<&RelationDef> {
        self.relations.get(&format!("{entity}.{property}"))
    }

    /// All relations navigable from `one_side` to `many_side`.
    pub fn relations_between(&self, one_side: &str, many_side: &str) -> Vec<&RelationDef> {
        self.relations
            .values()
            .filter(|r| r.connects(one_side, many_side))
            .collect()
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Decode a schema bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidSchema(e.to_string()))
    }

    /// Encode this schema bundle as JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSchema(e.to_string()))
    }
}
