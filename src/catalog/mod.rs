//! The authoritative in-memory map from relation name to persistent
//! relation state (`spec.md` §3, §4.3), plus the metadata key-naming
//! scheme shared with the store adapter.

use im::HashMap as ImHashMap;

use crate::expr::CompiledPredicate;
use crate::relation::{Header, RelationValue};

/// A persistent relation's full state: header, current value, declared key
/// (empty = none declared) and the row-constraint dictionary. Cheap to
/// clone (`im` structural sharing) because transaction frames clone this
/// wholesale into their overlay on first touch (`spec.md` §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentRelation {
    pub header: Header,
    pub value: RelationValue,
    pub key: Vec<String>,
    pub constraints: ImHashMap<String, CompiledPredicate>,
}

impl PersistentRelation {
    pub fn new(header: Header, value: RelationValue) -> Self {
        PersistentRelation { header, value, key: Vec::new(), constraints: ImHashMap::new() }
    }
}

/// Process-wide catalog: name → persistent relation, mutated only by the
/// transaction manager's outermost-commit flush (`spec.md` §5: "protected
/// by an internal mutex; reads acquire a shared lock, writes an exclusive
/// lock for the critical section").
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    relations: ImHashMap<String, PersistentRelation>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog { relations: ImHashMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<&PersistentRelation> {
        self.relations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, rel: PersistentRelation) {
        self.relations.insert(name.into(), rel);
    }

    pub fn remove(&mut self, name: &str) -> Option<PersistentRelation> {
        self.relations.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PersistentRelation)> {
        self.relations.iter().map(|(k, v)| (k.as_str(), v))
    }
}

pub fn meta_relations_key(name: &str) -> String {
    format!("__meta_relations__:{name}")
}

pub fn meta_constraints_key(name: &str) -> String {
    format!("__meta_constraints__:{name}")
}

pub fn meta_keys_key(name: &str) -> String {
    format!("__meta_keys__:{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AttrType;

    #[test]
    fn catalog_set_and_get_round_trip() {
        let mut catalog = Catalog::new();
        let header = Header::new([("a".to_string(), AttrType::Int)]).unwrap();
        let rel = PersistentRelation::new(header.clone(), RelationValue::empty(header));
        catalog.set("r", rel.clone());
        assert_eq!(catalog.get("r"), Some(&rel));
        assert!(catalog.contains("r"));
        assert!(!catalog.contains("missing"));
    }
}
