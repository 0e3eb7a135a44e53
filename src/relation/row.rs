use std::hash::{Hash, Hasher};

use im::HashMap as ImHashMap;

use crate::core::Value;

/// A mapping from attribute name to value. Rows are value-typed: equality is
/// structural, independent of attribute insertion order.
///
/// `im::HashMap` does not itself implement `Hash` (unordered collections
/// generally can't without picking a canonical order), so `Row` hashes its
/// sorted entries instead — needed because `RelationValue` stores rows in an
/// `im::HashSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row(ImHashMap<String, Value>);

impl Row {
    pub fn new(attrs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Row(attrs.into_iter().collect())
    }

    pub fn empty() -> Self {
        Row(ImHashMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Returns a new row with the named attributes replaced (`update`'s RHS
    /// application, `spec.md` §4.5).
    pub fn with_replaced(&self, replacements: impl IntoIterator<Item = (String, Value)>) -> Row {
        let mut next = self.0.clone();
        for (name, value) in replacements {
            next.insert(name, value);
        }
        Row(next)
    }

    /// Projects this row onto a subset of attribute names, used for key
    /// uniqueness checks (`spec.md` §4.3/§4.5).
    pub fn project(&self, names: &[String]) -> Row {
        let mut next = ImHashMap::new();
        for name in names {
            if let Some(v) = self.0.get(name) {
                next.insert(name.clone(), v.clone());
            }
        }
        Row(next)
    }
}

impl Hash for Row {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut entries: Vec<(&String, &Value)> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (k, v) in entries {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Row::new(iter)
    }
}
