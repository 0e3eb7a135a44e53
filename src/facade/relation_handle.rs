//! Persistent relation handle operations: `insert`, `update`, `delete`,
//! `assign` (`spec.md` §4.5). A handle is a thin `(Database, name)` pair —
//! closing the database invalidates every handle that was built from it,
//! because they share the same `Arc<Inner>` and every operation re-checks
//! `ensure_open`.

use super::Database;
use crate::constraints;
use crate::core::{DbError, Result};
use crate::expr::eval;
use crate::relation::{RelationValue, Row};

/// What `insert` accepts: a single row or a whole relation value.
pub enum InsertValue {
    Row(Row),
    Relation(RelationValue),
}

#[derive(Clone)]
pub struct Relation {
    db: Database,
    name: String,
}

impl Relation {
    pub(super) fn new(db: Database, name: String) -> Self {
        Relation { db, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn current(&self) -> Result<crate::catalog::PersistentRelation> {
        self.db.ensure_open()?;
        self.db.current_view(&self.name).ok_or_else(|| DbError::UnknownRelation(self.name.clone()))
    }

    /// `insert(value)` (`spec.md` §4.5).
    pub fn insert(&self, value: InsertValue) -> Result<()> {
        self.db.ensure_open()?;
        let name = self.name.clone();
        self.db.mutate(|db| {
            let mut rel = db.current_view(&name).ok_or_else(|| DbError::UnknownRelation(name.clone()))?;
            let new_rows: Vec<Row> = match &value {
                InsertValue::Row(r) => {
                    if !rel.header.row_conforms(r) {
                        return Err(DbError::HeaderMismatch { relation: name.clone() });
                    }
                    vec![r.clone()]
                }
                InsertValue::Relation(v) => {
                    if v.header() != &rel.header {
                        return Err(DbError::HeaderMismatch { relation: name.clone() });
                    }
                    v.iter().cloned().collect()
                }
            };
            if !rel.key.is_empty() {
                for row in &new_rows {
                    if let Some(collision) = rel.value.find_key_collision(&rel.key, row) {
                        return Err(DbError::KeyViolated {
                            key_attrs: rel.key.clone(),
                            offending_rows: vec![collision, row.clone()],
                        });
                    }
                }
            }
            let mut next = rel.value.clone();
            for row in new_rows {
                next = next.with_row(row);
            }
            let ns = db.0.namespace.read().expect("namespace lock poisoned");
            constraints::check_all_rows(&next, &rel.constraints, &ns)?;
            constraints::check_key(&next, &rel.key)?;
            drop(ns);
            rel.value = next;
            db.0.txm.put(&name, rel);
            Ok(())
        })
    }

    /// `update(where_src, attr₁=expr₁, …)` (`spec.md` §4.5).
    pub fn update(&self, where_src: &str, assignments: &[(&str, &str)]) -> Result<()> {
        self.db.ensure_open()?;
        let name = self.name.clone();
        let where_predicate = crate::expr::parser::parse(where_src)?;
        let mut compiled_assignments = Vec::with_capacity(assignments.len());
        for (attr, src) in assignments {
            compiled_assignments.push((attr.to_string(), crate::expr::parser::parse(src)?));
        }
        self.db.mutate(|db| {
            let mut rel = db.current_view(&name).ok_or_else(|| DbError::UnknownRelation(name.clone()))?;
            let ns = db.0.namespace.read().expect("namespace lock poisoned");
            let mut next_rows = Vec::with_capacity(rel.value.len());
            for row in rel.value.iter() {
                if eval::eval_bool(&where_predicate, row, &ns) {
                    let mut replacements = Vec::with_capacity(compiled_assignments.len());
                    for (attr, expr) in &compiled_assignments {
                        replacements.push((attr.clone(), eval::eval(expr, row, &ns)?));
                    }
                    next_rows.push(row.with_replaced(replacements));
                } else {
                    next_rows.push(row.clone());
                }
            }
            let next = RelationValue::new(rel.header.clone(), next_rows)?;
            constraints::check_all_rows(&next, &rel.constraints, &ns)?;
            constraints::check_key(&next, &rel.key)?;
            drop(ns);
            rel.value = next;
            db.0.txm.put(&name, rel);
            Ok(())
        })
    }

    /// `delete(where_src)` (`spec.md` §4.5). No predicate/key check
    /// required: removing rows can never introduce a new violation.
    pub fn delete(&self, where_src: &str) -> Result<()> {
        self.db.ensure_open()?;
        let name = self.name.clone();
        let predicate = crate::expr::parser::parse(where_src)?;
        self.db.mutate(|db| {
            let mut rel = db.current_view(&name).ok_or_else(|| DbError::UnknownRelation(name.clone()))?;
            let ns = db.0.namespace.read().expect("namespace lock poisoned");
            let kept = rel.value.filter(|row| !eval::eval_bool(&predicate, row, &ns));
            drop(ns);
            rel.value = kept;
            db.0.txm.put(&name, rel);
            Ok(())
        })
    }

    /// `assign(v)`: wholesale replacement, `spec.md` §4.3 semantics.
    pub fn assign(&self, value: RelationValue) -> Result<()> {
        self.db.set(&self.name, super::SetInput::Value(value))
    }

    pub fn header(&self) -> Result<crate::relation::Header> {
        Ok(self.current()?.header)
    }

    pub fn value(&self) -> Result<RelationValue> {
        Ok(self.current()?.value)
    }
}
