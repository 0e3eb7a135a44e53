//! Scalar values that can live in a row, and the declared type of an attribute.
//!
//! Built-in scalars (`Int`, `Float`, `Text`, `Bool`) cover the common case;
//! `Value::Custom` lets a client register its own domain types (the `CID`,
//! `SID` types from the scenarios) without the core knowing their Rust type.
//! A domain value only needs to implement [`DomainScalar`]: equality,
//! hashing, ordering and a text form, all object-safe so they can be stored
//! behind `Arc<dyn DomainScalar>`.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A user-defined scalar domain type's runtime behavior.
///
/// Implementors must be careful that `dyn_eq` only ever returns true for
/// values of the same concrete type (check `type_tag()` first, or rely on
/// `as_any().downcast_ref`), otherwise `Value`'s `Eq`/`Hash` impls become
/// inconsistent and relation sets will misbehave.
pub trait DomainScalar: fmt::Debug + Send + Sync {
    /// Stable tag identifying this domain type, e.g. `"CID"`.
    fn type_tag(&self) -> &'static str;
    fn dyn_eq(&self, other: &dyn DomainScalar) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn dyn_cmp(&self, other: &dyn DomainScalar) -> Option<Ordering>;
    /// Canonical text representation, used both for `Display` and as the
    /// on-disk encoding the codec round-trips through the type's registered
    /// constructor (see `crate::expr::namespace::TypeRegistry`).
    fn to_text(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Custom(Arc<dyn DomainScalar>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Int(_) => "INT",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Bool(_) => "BOOL",
            Self::Custom(v) => v.type_tag(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::Text(s) => !s.is_empty(),
            Self::Custom(_) => true,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Custom(a), Self::Custom(b)) => a.dyn_cmp(b.as_ref()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            // Exact bit comparison, not approximate: `Value` must be a lawful
            // `Eq`/`Hash` pair because rows sit in `im::HashSet` relation sets.
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => a.type_tag() == b.type_tag() && a.dyn_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            Self::Int(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Self::Float(f) => {
                2u8.hash(state);
                f.to_bits().hash(state);
            }
            Self::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Self::Bool(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            Self::Custom(v) => {
                5u8.hash(state);
                v.type_tag().hash(state);
                v.dyn_hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(fl) => write!(f, "{fl}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Custom(v) => write!(f, "{}", v.to_text()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// The declared type of one attribute of a header.
///
/// `Custom` names a domain type by its stable tag; the type's actual
/// behavior (equality, ordering, text form) lives on the `Value::Custom`
/// payload itself, not here — `AttrType` only needs to answer "is this value
/// shaped right for this attribute".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrType {
    Int,
    Float,
    Text,
    Bool,
    Custom(String),
}

impl AttrType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Int, Value::Int(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Int(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::Custom(tag), Value::Custom(v)) => tag == v.type_tag(),
            _ => false,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "INT"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Bool => write!(f, "BOOL"),
            Self::Custom(tag) => write!(f, "{tag}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Cid(String);
    impl DomainScalar for Cid {
        fn type_tag(&self) -> &'static str {
            "CID"
        }
        fn dyn_eq(&self, other: &dyn DomainScalar) -> bool {
            other
                .as_any()
                .downcast_ref::<Cid>()
                .is_some_and(|o| o.0 == self.0)
        }
        fn dyn_hash(&self, mut state: &mut dyn Hasher) {
            self.0.hash(&mut state);
        }
        fn dyn_cmp(&self, other: &dyn DomainScalar) -> Option<Ordering> {
            other.as_any().downcast_ref::<Cid>().map(|o| self.0.cmp(&o.0))
        }
        fn to_text(&self) -> String {
            self.0.clone()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn custom_values_compare_by_tag_and_payload() {
        let a = Value::Custom(Arc::new(Cid("C1".into())));
        let b = Value::Custom(Arc::new(Cid("C1".into())));
        let c = Value::Custom(Arc::new(Cid("C2".into())));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn attr_type_checks_custom_tag() {
        let t = AttrType::Custom("CID".into());
        assert!(t.is_compatible(&Value::Custom(Arc::new(Cid("C1".into())))));
        assert!(!t.is_compatible(&Value::Int(1)));
    }

    #[test]
    fn float_equality_is_exact_not_epsilon() {
        assert_eq!(Value::Float(1.0), Value::Float(1.0));
        assert_ne!(Value::Float(1.0), Value::Float(1.0 + f64::EPSILON));
    }
}
