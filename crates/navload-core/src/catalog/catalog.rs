//! In-memory catalog implementing [`SchemaLookup`].

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use super::{EntityDef, FieldRef, LookupError, PropertyRef, RelationDef, SchemaBundle, SchemaLookup};

/// Holds the current schema bundle and answers lookups against it.
pub struct Catalog {
    /// Current schema version (cached).
    current_version: AtomicU64,
    /// Current schema.
    current_schema: RwLock<SchemaBundle>,
}

impl Catalog {
    /// Create an empty catalog (version 0).
    pub fn new() -> Self {
        Self {
            current_version: AtomicU64::new(0),
            current_schema: RwLock::new(SchemaBundle::default()),
        }
    }

    /// Create a catalog and apply `bundle` to it.
    pub fn with_schema(bundle: SchemaBundle) -> Self {
        let catalog = Self::new();
        catalog.apply_schema(bundle);
        catalog
    }

    /// Get the current schema version.
    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::SeqCst)
    }

    /// Get a copy of the current schema bundle.
    pub fn current_schema(&self) -> SchemaBundle {
        self.current_schema.read().clone()
    }

    /// Replace the schema. Returns the new version number, which is always
    /// greater than the previous one.
    pub fn apply_schema(&self, mut bundle: SchemaBundle) -> u64 {
        let mut guard = self.current_schema.write();
        let new_version = self.current_version() + 1;
        bundle.version = new_version;
        *guard = bundle;
        self.current_version.store(new_version, Ordering::SeqCst);
        debug!(version = new_version, entities = guard.entities.len(), "schema applied");
        new_version
    }

    /// Get an entity definition by name.
    pub fn get_entity(&self, name: &str) -> Option<EntityDef> {
        self.current_schema.read().get_entity(name).cloned()
    }

    /// Get the relation behind `entity.property`.
    pub fn get_relation(&self, entity: &str, property: &str) -> Option<RelationDef> {
        self.current_schema.read().get_relation(entity, property).cloned()
    }

    fn require_entity(schema: &SchemaBundle, name: &str) -> Result<(), LookupError> {
        if schema.get_entity(name).is_some() {
            Ok(())
        } else {
            Err(LookupError::UnknownEntity(name.to_string()))
        }
    }

    fn single_relation<'s>(
        schema: &'s SchemaBundle,
        one_side: &str,
        many_side: &str,
    ) -> Result<&'s RelationDef, LookupError> {
        Self::require_entity(schema, one_side)?;
        Self::require_entity(schema, many_side)?;

        match schema.relations_between(one_side, many_side).as_slice() {
            [] => Err(LookupError::NoForeignKey {
                many_side: many_side.to_string(),
                one_side: one_side.to_string(),
            }),
            [relation] => Ok(relation),
            many => Err(LookupError::AmbiguousRelation {
                one_side: one_side.to_string(),
                many_side: many_side.to_string(),
                count: many.len(),
            }),
        }
    }

    fn property_ref(relation: &RelationDef) -> PropertyRef {
        PropertyRef {
            owner: relation.from_entity.clone(),
            name: relation.name.clone(),
            target: relation.to_entity.clone(),
            key_field: relation.from_field.clone(),
            foreign_key_field: relation.to_field.clone(),
            writable: relation.writable,
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaLookup for Catalog {
    fn key_fields_of(&self, entity_type: &str) -> Result<Vec<FieldRef>, LookupError> {
        let schema = self.current_schema.read();
        let entity = schema
            .get_entity(entity_type)
            .ok_or_else(|| LookupError::UnknownEntity(entity_type.to_string()))?;

        if entity.key_fields.is_empty() {
            return Err(LookupError::NoKey(entity_type.to_string()));
        }

        Ok(entity
            .key_fields
            .iter()
            .map(|f| FieldRef::new(entity_type, f.as_str()))
            .collect())
    }

    fn foreign_key_field_of(
        &self,
        many_side: &str,
        one_side: &str,
    ) -> Result<FieldRef, LookupError> {
        let schema = self.current_schema.read();
        let relation = Self::single_relation(&schema, one_side, many_side)?;
        Ok(FieldRef::new(many_side, relation.to_field.as_str()))
    }

    fn navigation_property_of(
        &self,
        one_side: &str,
        many_side: &str,
    ) -> Result<PropertyRef, LookupError> {
        let schema = self.current_schema.read();
        let relation = Self::single_relation(&schema, one_side, many_side)?;
        Ok(Self::property_ref(relation))
    }

    fn property_of(&self, entity_type: &str, property: &str) -> Result<PropertyRef, LookupError> {
        let schema = self.current_schema.read();
        Self::require_entity(&schema, entity_type)?;
        schema
            .get_relation(entity_type, property)
            .map(Self::property_ref)
            .ok_or_else(|| LookupError::UnknownProperty {
                entity: entity_type.to_string(),
                property: property.to_string(),
            })
    }

    fn has_field(&self, entity_type: &str, field: &str) -> Result<bool, LookupError> {
        let schema = self.current_schema.read();
        schema
            .get_entity(entity_type)
            .map(|e| e.has_field(field))
            .ok_or_else(|| LookupError::UnknownEntity(entity_type.to_string()))
    }

    fn schema_version(&self) -> u64 {
        self.current_version()
    }
}
