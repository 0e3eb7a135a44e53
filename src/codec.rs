//! Converts [`Value`]s to and from the backing store's column
//! representation, and serializes the opaque metadata blobs (constraint
//! sources, key declarations) the store persists as byte strings
//! (`spec.md` §4.1).

use serde::{Deserialize, Serialize};

use crate::core::{AttrType, DbError, Result, Value};
use crate::expr::ExpressionNamespace;

/// The backing store's column value: every `Value` variant collapses into
/// one of these before it reaches `StoreAdapter`. `Custom` values round-trip
/// as `(tag, text)`, reconstructed through the type's registered
/// constructor on read (`spec.md`'s "user-defined types must provide
/// equality and hashing").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Custom(String, String),
}

pub fn encode(value: &Value) -> StoreValue {
    match value {
        Value::Null => StoreValue::Null,
        Value::Int(i) => StoreValue::Int(*i),
        Value::Float(f) => StoreValue::Float(*f),
        Value::Text(s) => StoreValue::Text(s.clone()),
        Value::Bool(b) => StoreValue::Bool(*b),
        Value::Custom(c) => StoreValue::Custom(c.type_tag().to_string(), c.to_text()),
    }
}

/// Reconstructs a `Value` from its stored column value. `Custom` values
/// require the constructor registered under their tag; an unregistered tag
/// means the relation can't be loaded in this process.
pub fn decode(stored: &StoreValue, attr_type: &AttrType, namespace: &ExpressionNamespace) -> Result<Value> {
    match stored {
        StoreValue::Null => Ok(Value::Null),
        StoreValue::Int(i) => Ok(Value::Int(*i)),
        StoreValue::Float(f) => Ok(Value::Float(*f)),
        StoreValue::Text(s) => Ok(Value::Text(s.clone())),
        StoreValue::Bool(b) => Ok(Value::Bool(*b)),
        StoreValue::Custom(tag, text) => {
            let AttrType::Custom(expected_tag) = attr_type else {
                return Err(DbError::StoreError(format!(
                    "stored value tagged '{tag}' but attribute type is {attr_type}"
                )));
            };
            if expected_tag != tag {
                return Err(DbError::StoreError(format!(
                    "stored value tag '{tag}' does not match attribute type '{expected_tag}'"
                )));
            }
            namespace.call(tag, &[Value::Text(text.clone())])
        }
    }
}

/// Sorted key attribute list, the stable on-disk form of a key declaration.
pub fn encode_key(attrs: &[String]) -> Vec<String> {
    let mut sorted = attrs.to_vec();
    sorted.sort();
    sorted
}
