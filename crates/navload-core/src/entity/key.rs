//! Hashable join keys.

use std::fmt;

use navload_proto::Value;

/// A key or foreign-key value normalized for hashing.
///
/// Integers of either width collapse to one variant so an `Int32` foreign
/// key joins an `Int64` primary key. Null and floating-point values have no
/// key; rows carrying them never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    Timestamp(i64),
    String(String),
    Bytes(Vec<u8>),
    Uuid([u8; 16]),
}

impl KeyValue {
    /// Normalize a field value into a join key.
    pub fn from_value(value: &Value) -> Option<KeyValue> {
        match value {
            Value::Null | Value::Float32(_) | Value::Float64(_) => None,
            Value::Bool(b) => Some(KeyValue::Bool(*b)),
            Value::Int32(i) => Some(KeyValue::Int(*i as i64)),
            Value::Int64(i) => Some(KeyValue::Int(*i)),
            Value::Timestamp(t) => Some(KeyValue::Timestamp(*t)),
            Value::String(s) => Some(KeyValue::String(s.clone())),
            Value::Bytes(b) => Some(KeyValue::Bytes(b.clone())),
            Value::Uuid(u) => Some(KeyValue::Uuid(*u)),
        }
    }

    /// Convert back into a field value.
    pub fn to_value(&self) -> Value {
        match self {
            KeyValue::Bool(b) => Value::Bool(*b),
            KeyValue::Int(i) => Value::Int64(*i),
            KeyValue::Timestamp(t) => Value::Timestamp(*t),
            KeyValue::String(s) => Value::String(s.clone()),
            KeyValue::Bytes(b) => Value::Bytes(b.clone()),
            KeyValue::Uuid(u) => Value::Uuid(*u),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(b) => write!(f, "{b}"),
            KeyValue::Int(i) => write!(f, "{i}"),
            KeyValue::Timestamp(t) => write!(f, "@{t}"),
            KeyValue::String(s) => write!(f, "{s:?}"),
            KeyValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            KeyValue::Uuid(u) => {
                for byte in u {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}
