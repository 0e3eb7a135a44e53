//! Black-box coverage of constraint administration through the facade:
//! row predicates, keys, and their interaction (`spec.md` §4.3/§4.4).

mod common;

use reldb::{Database, InsertValue, SetInput, StoreConfig};

use common::*;

fn memory_db() -> Database {
    common::init_tracing();
    let db = Database::open(StoreConfig::Memory).unwrap();
    register_domain_types(&db);
    db
}

#[test]
fn constrain_rows_rejects_unparseable_predicate() {
    let db = memory_db();
    db.set("exam_marks", SetInput::Header(exam_marks_header())).unwrap();
    let err = db.constrain_rows("exam_marks", &[("broken", "mark <=")]).unwrap_err();
    match err {
        reldb::DbError::InvalidPredicate { .. } => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn remove_row_constraints_drops_a_named_predicate() {
    let db = memory_db();
    db.set("exam_marks", SetInput::Header(exam_marks_header())).unwrap();
    db.constrain_rows("exam_marks", &[("valid_mark", "0 <= mark <= 100")]).unwrap();
    db.remove_row_constraints("exam_marks", &["valid_mark"]).unwrap();
    assert!(db.row_constraints("exam_marks").unwrap().is_empty());

    let rel = db.relation("exam_marks").unwrap();
    rel.insert(InsertValue::Row(exam_marks_row("S1", "C1", 999))).unwrap();
    assert!(db.get("exam_marks").unwrap().contains(&exam_marks_row("S1", "C1", 999)));
}

#[test]
fn remove_row_constraints_unknown_name_errors() {
    let db = memory_db();
    db.set("exam_marks", SetInput::Header(exam_marks_header())).unwrap();
    let err = db.remove_row_constraints("exam_marks", &["does_not_exist"]).unwrap_err();
    assert!(matches!(err, reldb::DbError::UnknownConstraint(_, _)));
}

#[test]
fn set_key_rejects_when_existing_rows_already_collide() {
    let db = memory_db();
    db.set("is_called", SetInput::Header(is_called_header())).unwrap();
    let rel = db.relation("is_called").unwrap();
    rel.insert(InsertValue::Row(is_called_row("S1", "Anne"))).unwrap();
    rel.insert(InsertValue::Row(is_called_row("S2", "Anne"))).unwrap();

    let err = db.set_key("is_called", &["name"]).unwrap_err();
    match err {
        reldb::DbError::KeyViolated { key_attrs, offending_rows } => {
            assert_eq!(key_attrs, vec!["name".to_string()]);
            assert_eq!(offending_rows.len(), 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(db.key("is_called").unwrap().is_empty());
}

#[test]
fn key_is_enforced_on_subsequent_inserts() {
    let db = memory_db();
    db.set("is_called", SetInput::Header(is_called_header())).unwrap();
    db.set_key("is_called", &["student"]).unwrap();

    let rel = db.relation("is_called").unwrap();
    rel.insert(InsertValue::Row(is_called_row("S1", "Anne"))).unwrap();
    let err = rel.insert(InsertValue::Row(is_called_row("S1", "Someone Else"))).unwrap_err();
    assert!(matches!(err, reldb::DbError::KeyViolated { .. }));
    assert_eq!(db.get("is_called").unwrap().len(), 1);
}

#[test]
fn update_checks_constraints_against_the_whole_resulting_relation() {
    let db = memory_db();
    db.set("exam_marks", SetInput::Header(exam_marks_header())).unwrap();
    let rel = db.relation("exam_marks").unwrap();
    for row in documented_exam_marks() {
        rel.insert(InsertValue::Row(row)).unwrap();
    }
    db.constrain_rows("exam_marks", &[("valid_mark", "0 <= mark <= 100")]).unwrap();

    let err = rel.update(r#"student == SID("S2")"#, &[("mark", "500")]).unwrap_err();
    assert!(matches!(err, reldb::DbError::RowConstraintViolated { .. }));
    // The relation is untouched: S2's mark is still the original 49.
    let current = db.get("exam_marks").unwrap();
    assert!(current.contains(&exam_marks_row("S2", "C1", 49)));
}

#[test]
fn delete_never_needs_a_constraint_check() {
    let db = memory_db();
    db.set("exam_marks", SetInput::Header(exam_marks_header())).unwrap();
    let rel = db.relation("exam_marks").unwrap();
    for row in documented_exam_marks() {
        rel.insert(InsertValue::Row(row)).unwrap();
    }
    db.constrain_rows("exam_marks", &[("valid_mark", "0 <= mark <= 100")]).unwrap();

    rel.delete(r#"student == SID("S2")"#).unwrap();
    assert!(!db.get("exam_marks").unwrap().contains(&exam_marks_row("S2", "C1", 49)));
    assert_eq!(db.get("exam_marks").unwrap().len(), 5);
}

#[test]
fn insert_rejects_a_row_whose_value_does_not_inhabit_the_declared_type() {
    let db = memory_db();
    db.set("exam_marks", SetInput::Header(exam_marks_header())).unwrap();
    let rel = db.relation("exam_marks").unwrap();

    let bad_row = reldb::Row::new([
        ("student".to_string(), sid("S1")),
        ("course".to_string(), cid("C1")),
        ("mark".to_string(), reldb::Value::Text("oops".to_string())),
    ]);
    let err = rel.insert(InsertValue::Row(bad_row)).unwrap_err();
    assert!(matches!(err, reldb::DbError::HeaderMismatch { .. }));
    assert!(db.get("exam_marks").unwrap().is_empty());
}

#[test]
fn update_rejects_replacing_a_column_with_a_value_of_the_wrong_type() {
    let db = memory_db();
    db.set("exam_marks", SetInput::Header(exam_marks_header())).unwrap();
    let rel = db.relation("exam_marks").unwrap();
    for row in documented_exam_marks() {
        rel.insert(InsertValue::Row(row)).unwrap();
    }

    let err = rel.update(r#"student == SID("S2")"#, &[("mark", "\"oops\"")]).unwrap_err();
    assert!(matches!(err, reldb::DbError::HeaderMismatch { .. }));
    assert!(db.get("exam_marks").unwrap().contains(&exam_marks_row("S2", "C1", 49)));
}
