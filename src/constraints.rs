//! Compiles and enforces row predicates and key uniqueness (`spec.md`
//! §4.4). Stateless: the constraint dictionary itself lives on
//! [`crate::catalog::PersistentRelation`]; this module only knows how to
//! check candidate rows and relations against a dictionary handed to it.

use im::HashMap as ImHashMap;

use crate::core::{DbError, Result};
use crate::expr::{CompiledPredicate, ExpressionNamespace};
use crate::relation::{Row, RelationValue};

/// Compiles one predicate source string, surfacing parse failures as
/// `invalid predicate` rather than silently accepting garbage (`spec.md`
/// §4.4 step 1 — the only non-string rejection path reachable through this
/// crate's typed `Predicate` API is covered in `facade`; a source string
/// that fails to *parse* is its own, necessary failure mode).
pub fn compile(source: &str) -> Result<CompiledPredicate> {
    CompiledPredicate::compile(source)
}

/// Checks one row against every predicate in `constraints`, returning the
/// first violated (name, predicate) pair.
pub fn first_violation<'a>(
    row: &Row,
    constraints: &'a ImHashMap<String, CompiledPredicate>,
    namespace: &ExpressionNamespace,
) -> Option<(&'a str, &'a CompiledPredicate)> {
    let mut names: Vec<&String> = constraints.keys().collect();
    names.sort();
    for name in names {
        let predicate = &constraints[name];
        let (holds, _reason) = predicate.eval_bool_verbose(row, namespace);
        if !holds {
            return Some((name.as_str(), predicate));
        }
    }
    None
}

/// Validates every row of `value` against `constraints`, failing with
/// `row-constraint-violated` naming the first offender.
pub fn check_all_rows(
    value: &RelationValue,
    constraints: &ImHashMap<String, CompiledPredicate>,
    namespace: &ExpressionNamespace,
) -> Result<()> {
    let mut rows: Vec<&Row> = value.iter().collect();
    // Deterministic offender reporting regardless of the set's internal
    // iteration order.
    rows.sort_by_key(|r| format!("{r:?}"));
    for row in rows {
        if let Some((name, predicate)) = first_violation(row, constraints, namespace) {
            return Err(DbError::RowConstraintViolated {
                constraint_name: name.to_string(),
                predicate_source: predicate.source().to_string(),
                row: row.clone(),
            });
        }
    }
    Ok(())
}

/// Validates key uniqueness over the whole relation; fails with
/// `key-violated` naming every row sharing a colliding key projection with
/// some other row.
pub fn check_key(value: &RelationValue, key_attrs: &[String]) -> Result<()> {
    if key_attrs.is_empty() {
        return Ok(());
    }
    if value.project_is_injective(key_attrs) {
        return Ok(());
    }
    let mut seen: ImHashMap<Row, Vec<Row>> = ImHashMap::new();
    for row in value.iter() {
        let projected = row.project(key_attrs);
        seen.entry(projected).or_default().push(row.clone());
    }
    let offending: Vec<Row> = seen.values().filter(|rows| rows.len() > 1).flatten().cloned().collect();
    Err(DbError::KeyViolated { key_attrs: key_attrs.to_vec(), offending_rows: offending })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttrType, Value};
    use crate::relation::Header;

    fn header() -> Header {
        Header::new([
            ("student".to_string(), AttrType::Text),
            ("mark".to_string(), AttrType::Int),
        ])
        .unwrap()
    }

    fn row(student: &str, mark: i64) -> Row {
        Row::new([
            ("student".to_string(), Value::Text(student.into())),
            ("mark".to_string(), Value::Int(mark)),
        ])
    }

    #[test]
    fn check_all_rows_reports_first_offender() {
        let ns = ExpressionNamespace::new();
        let mut constraints = ImHashMap::new();
        constraints.insert("valid_mark".to_string(), compile("0 <= mark <= 100").unwrap());
        let value = RelationValue::new(header(), [row("S1", 50), row("S2", 102)]).unwrap();
        let err = check_all_rows(&value, &constraints, &ns).unwrap_err();
        match err {
            DbError::RowConstraintViolated { constraint_name, .. } => {
                assert_eq!(constraint_name, "valid_mark");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn check_key_detects_collision() {
        let value = RelationValue::new(header(), [row("S1", 50), row("S1", 90)]).unwrap();
        let err = check_key(&value, &["student".to_string()]).unwrap_err();
        match err {
            DbError::KeyViolated { offending_rows, .. } => assert_eq!(offending_rows.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn check_key_passes_when_unique() {
        let value = RelationValue::new(header(), [row("S1", 50), row("S2", 90)]).unwrap();
        assert!(check_key(&value, &["student".to_string()]).is_ok());
    }
}
