//! Embedded relational database engine that treats the relational algebra,
//! not SQL, as its query language. A client constructs typed relations,
//! binds them to names in a [`facade::Database`]'s catalog, imposes
//! row-predicate and key constraints, and mutates them through
//! insert/update/delete/assign inside nested, per-thread transactions.
//!
//! The in-memory relational algebra itself — joins, renames, the full
//! operator set — is out of scope: `crate::relation` ships only the
//! minimal vocabulary (`Header`, `Row`, `RelationValue`, and the handful of
//! set operations the catalog and constraint engine need) this crate's own
//! layer is built on.

pub mod catalog;
pub mod codec;
pub mod constraints;
pub mod core;
pub mod expr;
pub mod facade;
pub mod identifier;
pub mod relation;
pub mod store;
pub mod transaction;

pub use core::{AttrType, DbError, DomainScalar, Result, Value};
pub use facade::{Database, InsertValue, Relation, SetInput, StoreConfig};
pub use relation::{Header, Row, RelationValue};
