use std::fmt;

use im::HashMap as ImHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{AttrType, Result};
use crate::identifier::validate_identifier;

use super::Row;

/// An unordered attribute-name → attribute-type mapping.
///
/// Two headers are equal iff their name→type maps are equal, regardless of
/// the order attributes were declared in (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header(ImHashMap<String, AttrType>);

impl Header {
    pub fn new(attrs: impl IntoIterator<Item = (String, AttrType)>) -> Result<Self> {
        let mut map = ImHashMap::new();
        for (name, ty) in attrs {
            validate_identifier(&name)?;
            map.insert(name, ty);
        }
        Ok(Header(map))
    }

    pub fn empty() -> Self {
        Header(ImHashMap::new())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&AttrType> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrType)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether `row` is a row of this header: same attribute names, and
    /// every value inhabits its attribute's declared type (`spec.md` §3,
    /// "Row... a mapping whose keys equal a header's names and whose
    /// values inhabit the corresponding types").
    pub fn row_conforms(&self, row: &Row) -> bool {
        row.arity() == self.arity()
            && row.iter().all(|(name, value)| self.get(name).is_some_and(|ty| ty.is_compatible(value)))
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        write!(f, "{{{}}}", names.join(", "))
    }
}
