use im::HashSet as ImHashSet;

use crate::core::{DbError, Result};

use super::{Header, Row};

/// A set of rows sharing one header. Relations are immutable values: every
/// mutating method here returns a new `RelationValue`; the catalog is what
/// gives a *name* to a sequence of such values over time (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationValue {
    header: Header,
    rows: ImHashSet<Row>,
}

impl RelationValue {
    pub fn empty(header: Header) -> Self {
        RelationValue { header, rows: ImHashSet::new() }
    }

    pub fn new(header: Header, rows: impl IntoIterator<Item = Row>) -> Result<Self> {
        let mut set = ImHashSet::new();
        for row in rows {
            if !header.row_conforms(&row) {
                return Err(DbError::HeaderMismatch { relation: String::new() });
            }
            set.insert(row);
        }
        Ok(RelationValue { header, rows: set })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row: &Row) -> bool {
        self.rows.contains(row)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &ImHashSet<Row> {
        &self.rows
    }

    /// Relational union: `self ∪ other`. Both operands must share a header.
    pub fn union(&self, other: &RelationValue) -> Result<RelationValue> {
        if self.header != other.header {
            return Err(DbError::HeaderMismatch { relation: String::new() });
        }
        Ok(RelationValue { header: self.header.clone(), rows: self.rows.clone().union(other.rows.clone()) })
    }

    /// Inserts one row, returning the new relation value (caller checks the
    /// row's header before calling this; used by `insert`, `spec.md` §4.5).
    pub fn with_row(&self, row: Row) -> RelationValue {
        RelationValue { header: self.header.clone(), rows: self.rows.update(row) }
    }

    /// Keeps only rows matching `keep` (true = retained). Used by `delete`
    /// (rows for which `where_src` is false survive) and by `update`'s
    /// "rows not matched by the predicate" half.
    pub fn filter(&self, mut keep: impl FnMut(&Row) -> bool) -> RelationValue {
        let rows = self.rows.iter().filter(|r| keep(r)).cloned().collect();
        RelationValue { header: self.header.clone(), rows }
    }

    /// Projects every row onto `names`, used for key-uniqueness checks: the
    /// projection is injective iff the resulting set's length equals the
    /// number of source rows.
    pub fn project_is_injective(&self, names: &[String]) -> bool {
        let mut seen = ImHashSet::new();
        for row in self.rows.iter() {
            let projected = row.project(names);
            if seen.contains(&projected) {
                return false;
            }
            seen.insert(projected);
        }
        true
    }

    /// First row (if any) whose key projection collides with `candidate`'s.
    pub fn find_key_collision(&self, key_attrs: &[String], candidate: &Row) -> Option<Row> {
        let projected_candidate = candidate.project(key_attrs);
        self.rows
            .iter()
            .find(|r| *r != candidate && r.project(key_attrs) == projected_candidate)
            .cloned()
    }
}
