//! Entity rows and shared entity handles.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use navload_proto::Value;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A materialized entity row.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    entity_type: String,
    fields: Vec<(String, Value)>,
    collections: BTreeMap<String, Vec<EntityRef>>,
}

impl Entity {
    /// Create an entity with no fields.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: Vec::new(),
            collections: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Set a scalar field, replacing any previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Entity type name.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Scalar fields in declaration order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Get a scalar field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// A loaded relationship collection, or `None` if it was never assigned.
    pub fn collection(&self, property: &str) -> Option<&[EntityRef]> {
        self.collections.get(property).map(Vec::as_slice)
    }

    /// Whether a relationship collection has been assigned.
    pub fn is_loaded(&self, property: &str) -> bool {
        self.collections.contains_key(property)
    }

    /// Assign a relationship collection, replacing the previous one.
    pub fn set_collection(&mut self, property: impl Into<String>, children: Vec<EntityRef>) {
        self.collections.insert(property.into(), children);
    }

    /// Names of the assigned relationship collections.
    pub fn loaded_collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

/// Shared, interior-mutable handle to an [`Entity`].
///
/// Clones share the same row. Identity ([`ptr_eq`](EntityRef::ptr_eq),
/// [`identity`](EntityRef::identity)) is the handle's allocation, not the
/// row's key, so two handles to equal rows are still distinct entities.
#[derive(Clone)]
pub struct EntityRef(Arc<RwLock<Entity>>);

impl EntityRef {
    /// Wrap an entity.
    pub fn new(entity: Entity) -> Self {
        Self(Arc::new(RwLock::new(entity)))
    }

    /// Whether both handles point at the same entity.
    pub fn ptr_eq(&self, other: &EntityRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity of the underlying allocation.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Lock for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Entity> {
        self.0.read()
    }

    /// Lock for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, Entity> {
        self.0.write()
    }

    /// Entity type name.
    pub fn entity_type(&self) -> String {
        self.read().entity_type().to_string()
    }

    /// Copy of a scalar field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.read().get(field).cloned()
    }

    /// Copy of a loaded relationship collection.
    pub fn collection(&self, property: &str) -> Option<Vec<EntityRef>> {
        self.read().collection(property).map(<[EntityRef]>::to_vec)
    }

    /// Whether a relationship collection has been assigned.
    pub fn is_loaded(&self, property: &str) -> bool {
        self.read().is_loaded(property)
    }

    /// Assign a relationship collection.
    pub fn set_collection(&self, property: impl Into<String>, children: Vec<EntityRef>) {
        self.write().set_collection(property, children);
    }

    /// Clone of the current row.
    pub fn snapshot(&self) -> Entity {
        self.read().clone()
    }
}

impl From<Entity> for EntityRef {
    fn from(entity: Entity) -> Self {
        EntityRef::new(entity)
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never block: a writer may hold the lock while something logs.
        match self.0.try_read() {
            Some(entity) => f
                .debug_struct("EntityRef")
                .field("type", &entity.entity_type)
                .field("fields", &entity.fields)
                .field(
                    "collections",
                    &entity
                        .collections
                        .iter()
                        .map(|(k, v)| (k.as_str(), v.len()))
                        .collect::<Vec<_>>(),
                )
                .finish(),
            None => f.write_str("EntityRef(<locked>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_access() {
        let mut user = Entity::new("User")
            .with_field("id", 1i64)
            .with_field("name", "Alice");

        assert_eq!(user.entity_type(), "User");
        assert_eq!(user.get("id"), Some(&Value::Int64(1)));
        assert_eq!(user.get("email"), None);

        user.set_field("name", "Bob");
        assert_eq!(user.get("name").and_then(Value::as_str), Some("Bob"));
        assert_eq!(user.fields().len(), 2);
    }

    #[test]
    fn test_collections_start_unloaded() {
        let user = EntityRef::new(Entity::new("User").with_field("id", 1i64));
        assert!(!user.is_loaded("posts"));
        assert!(user.collection("posts").is_none());

        user.set_collection("posts", Vec::new());
        assert!(user.is_loaded("posts"));
        assert_eq!(user.collection("posts").map(|c| c.len()), Some(0));
    }

    #[test]
    fn test_identity() {
        let a = EntityRef::new(Entity::new("Post").with_field("id", 1i64));
        let b = EntityRef::new(Entity::new("Post").with_field("id", 1i64));
        let a2 = a.clone();

        assert!(a.ptr_eq(&a2));
        assert_eq!(a.identity(), a2.identity());
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_does_not_block_on_writer() {
        let entity = EntityRef::new(Entity::new("User"));
        let guard = entity.write();
        let rendered = format!("{:?}", entity);
        drop(guard);
        assert_eq!(rendered, "EntityRef(<locked>)");
    }
}
