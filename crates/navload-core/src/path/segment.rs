//! Resolved hops and the accessors bound to them.

use std::fmt;

use navload_proto::Value;

use crate::catalog::{FieldRef, PropertyRef};
use crate::entity::{EntityRef, KeyValue};
use crate::error::ConfigError;
use crate::modifier::{Modifier, Row};
use crate::query::{FilterEvaluator, RelationStep};

/// Reads one key-capable field of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyAccessor {
    entity_type: String,
    field: String,
}

impl KeyAccessor {
    /// Bind to a schema field.
    pub fn bind(field: &FieldRef) -> Self {
        Self {
            entity_type: field.entity.clone(),
            field: field.field.clone(),
        }
    }

    /// Entity type the accessor reads from.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The raw field value.
    pub fn value_of(&self, row: &impl Row) -> Option<Value> {
        row.with_fields(|fields| FilterEvaluator::get_field_value(fields, &self.field).cloned())
    }

    /// The field as a join key. Missing, null and float values have none.
    pub fn key_of(&self, row: &impl Row) -> Option<KeyValue> {
        row.with_fields(|fields| {
            FilterEvaluator::get_field_value(fields, &self.field).and_then(KeyValue::from_value)
        })
    }
}

/// Assigns loaded children onto a parent's relationship collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildSetter {
    owner: String,
    property: String,
}

impl ChildSetter {
    /// Bind to a navigation property. Read-only properties are rejected.
    pub fn bind(property: &PropertyRef) -> Result<Self, ConfigError> {
        if !property.writable {
            return Err(ConfigError::MissingSetter {
                entity: property.owner.clone(),
                property: property.name.clone(),
            });
        }
        Ok(Self {
            owner: property.owner.clone(),
            property: property.name.clone(),
        })
    }

    /// Entity type owning the collection.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Collection property name.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Replace the parent's collection with `children`.
    pub fn assign(&self, parent: &EntityRef, children: Vec<EntityRef>) {
        parent.set_collection(self.property.as_str(), children);
    }
}

/// One resolved hop of a navigation chain.
///
/// Immutable once built; only the resolver constructs segments.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    from_type: String,
    to_type: String,
    primary_key: KeyAccessor,
    foreign_key: KeyAccessor,
    setter: ChildSetter,
    modifiers: Vec<Modifier>,
}

impl PathSegment {
    pub(crate) fn new(
        primary_key: KeyAccessor,
        foreign_key: KeyAccessor,
        setter: ChildSetter,
        modifiers: Vec<Modifier>,
    ) -> Self {
        Self {
            from_type: primary_key.entity_type().to_string(),
            to_type: foreign_key.entity_type().to_string(),
            primary_key,
            foreign_key,
            setter,
            modifiers,
        }
    }

    /// Entity type on the "one" side.
    pub fn from_type(&self) -> &str {
        &self.from_type
    }

    /// Entity type on the "many" side.
    pub fn to_type(&self) -> &str {
        &self.to_type
    }

    /// Key accessor of `from_type`.
    pub fn primary_key(&self) -> &KeyAccessor {
        &self.primary_key
    }

    /// Foreign-key accessor of `to_type`.
    pub fn foreign_key(&self) -> &KeyAccessor {
        &self.foreign_key
    }

    /// Setter for the parent's collection.
    pub fn setter(&self) -> &ChildSetter {
        &self.setter
    }

    /// Modifiers in the caller's declared order.
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// The flat-map a query source needs to navigate this hop.
    pub fn relation_step(&self) -> RelationStep {
        RelationStep {
            from_entity: self.from_type.clone(),
            to_entity: self.to_type.clone(),
            property: self.setter.property().to_string(),
            key_field: self.primary_key.field().to_string(),
            foreign_key_field: self.foreign_key.field().to_string(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {} ({} = {})",
            self.from_type,
            self.setter.property(),
            self.to_type,
            self.foreign_key.field(),
            self.primary_key.field()
        )?;
        for modifier in &self.modifiers {
            write!(f, " .{}", modifier.method_name())?;
        }
        Ok(())
    }
}

/// An ordered, non-empty sequence of hops from a root type to a leaf type.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationChain {
    root_type: String,
    leaf_type: String,
    segments: Vec<PathSegment>,
}

impl NavigationChain {
    pub(crate) fn new(segments: Vec<PathSegment>) -> Result<Self, ConfigError> {
        let (first, last) = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => (first.from_type.clone(), last.to_type.clone()),
            _ => {
                return Err(ConfigError::InvalidNavigation(
                    "a navigation chain needs at least one hop".to_string(),
                ))
            }
        };
        Ok(Self {
            root_type: first,
            leaf_type: last,
            segments,
        })
    }

    /// Entity type of the first hop's parents.
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    /// Entity type of the last hop's children.
    pub fn leaf_type(&self) -> &str {
        &self.leaf_type
    }

    /// All hops, root first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The first hop.
    pub fn first(&self) -> &PathSegment {
        // Non-empty by construction.
        &self.segments[0]
    }

    /// Number of hops.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Dotted property path, e.g. `posts.comments`.
    pub fn path(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.setter.property())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for NavigationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.root_type, self.path())
    }
}
