//! Shared scaffolding for integration tests: the `CID`/`SID` domain types
//! from the scenarios in `spec.md` §8, and small builders for headers and
//! rows so each scenario test reads close to the spec's literal tables.

use std::any::Any;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Once};

use reldb::{AttrType, DomainScalar, Header, Row, Value};

static TRACING_INIT: Once = Once::new();

/// Installs a `tracing` subscriber once per test binary so `db.open()`/
/// `transaction()` spans are visible with `RUST_LOG=reldb=debug cargo test
/// -- --nocapture`, mirroring the teacher's own test/example logging setup.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug)]
pub struct TaggedId {
    tag: &'static str,
    id: String,
}

impl DomainScalar for TaggedId {
    fn type_tag(&self) -> &'static str {
        self.tag
    }

    fn dyn_eq(&self, other: &dyn DomainScalar) -> bool {
        other.as_any().downcast_ref::<TaggedId>().is_some_and(|o| o.tag == self.tag && o.id == self.id)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.tag.hash(&mut state);
        self.id.hash(&mut state);
    }

    fn dyn_cmp(&self, other: &dyn DomainScalar) -> Option<Ordering> {
        other.as_any().downcast_ref::<TaggedId>().map(|o| self.id.cmp(&o.id))
    }

    fn to_text(&self) -> String {
        self.id.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn cid(id: &str) -> Value {
    Value::Custom(Arc::new(TaggedId { tag: "CID", id: id.to_string() }))
}

pub fn sid(id: &str) -> Value {
    Value::Custom(Arc::new(TaggedId { tag: "SID", id: id.to_string() }))
}

/// Registers `CID`/`SID` constructors on `db`, mirroring what S1 calls
/// "register value types CID, SID" before the first relation is created.
pub fn register_domain_types(db: &reldb::Database) {
    db.register_type(
        "CID",
        Arc::new(|args: &[Value]| {
            let id = args.first().and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(cid(&id))
        }),
    );
    db.register_type(
        "SID",
        Arc::new(|args: &[Value]| {
            let id = args.first().and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(sid(&id))
        }),
    );
}

pub fn is_called_header() -> Header {
    Header::new([
        ("student".to_string(), AttrType::Custom("SID".to_string())),
        ("name".to_string(), AttrType::Text),
    ])
    .unwrap()
}

pub fn is_called_row(student: &str, name: &str) -> Row {
    Row::new([("student".to_string(), sid(student)), ("name".to_string(), Value::Text(name.to_string()))])
}

pub fn exam_marks_header() -> Header {
    Header::new([
        ("student".to_string(), AttrType::Custom("SID".to_string())),
        ("course".to_string(), AttrType::Custom("CID".to_string())),
        ("mark".to_string(), AttrType::Int),
    ])
    .unwrap()
}

pub fn exam_marks_row(student: &str, course: &str, mark: i64) -> Row {
    Row::new([
        ("student".to_string(), sid(student)),
        ("course".to_string(), cid(course)),
        ("mark".to_string(), Value::Int(mark)),
    ])
}

pub fn is_enrolled_on_header() -> Header {
    Header::new([
        ("student".to_string(), AttrType::Custom("SID".to_string())),
        ("course".to_string(), AttrType::Custom("CID".to_string())),
    ])
    .unwrap()
}

pub fn is_enrolled_on_row(student: &str, course: &str) -> Row {
    Row::new([("student".to_string(), sid(student)), ("course".to_string(), cid(course))])
}

/// The six documented `exam_marks` rows used by S2/S3.
pub fn documented_exam_marks() -> Vec<Row> {
    vec![
        exam_marks_row("S1", "C1", 85),
        exam_marks_row("S2", "C1", 49),
        exam_marks_row("S3", "C1", 73),
        exam_marks_row("S1", "C2", 91),
        exam_marks_row("S4", "C2", 60),
        exam_marks_row("S5", "C1", 77),
    ]
}
