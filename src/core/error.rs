use thiserror::Error;

use crate::relation::Row;

/// One variant per error kind the database layer can raise.
///
/// Validation errors (`RowConstraintViolated`, `KeyViolated`, `HeaderMismatch`,
/// `TypeMismatch`) leave the target relation untouched: the failing operation
/// has no effect.
#[derive(Error, Debug, Clone)]
pub enum DbError {
    /// Operation on a closed database, or a handle that outlived its database.
    #[error("disconnected")]
    Disconnected,

    /// A relation name begins with underscore or is not a valid identifier.
    #[error("name-invalid: '{0}' is not a valid relation name")]
    NameInvalid(String),

    /// Operation names a relation absent from the catalog.
    #[error("unknown-relation: '{0}'")]
    UnknownRelation(String),

    /// Removal named a constraint absent from the relation.
    #[error("unknown-constraint: '{0}' on relation '{1}'")]
    UnknownConstraint(String, String),

    /// Assigned value's header differs from the target header.
    #[error("header-mismatch: relation '{relation}' expects a different header")]
    HeaderMismatch { relation: String },

    /// Assigned value is not a relation at all.
    #[error("type-mismatch: expected a relation value, got {actual_type}")]
    TypeMismatch { actual_type: String },

    /// A row predicate would be violated by a candidate mutation.
    #[error("row-constraint-violated: '{constraint_name}' ({predicate_source}) on row {row:?}")]
    RowConstraintViolated {
        constraint_name: String,
        predicate_source: String,
        row: Row,
    },

    /// A declared key would be violated by a candidate mutation.
    #[error("key-violated: key {key_attrs:?} on rows {offending_rows:?}")]
    KeyViolated {
        key_attrs: Vec<String>,
        offending_rows: Vec<Row>,
    },

    /// A predicate could not be represented as stored source text.
    #[error("predicate-not-serializable: {0}")]
    PredicateNotSerializable(String),

    /// The store adapter rejected the transaction flush.
    #[error("commit-failed: {0}")]
    CommitFailed(String),

    /// A predicate failed to parse or a constraint key is malformed.
    #[error("invalid predicate '{source}': {reason}")]
    InvalidPredicate { source: String, reason: String },

    /// Underlying store I/O failure outside the commit path (open/close/load).
    #[error("store-error: {0}")]
    StoreError(String),

    /// Not a true error kind: the distinguished Rollback signal a
    /// transaction block raises to discard its innermost frame without
    /// propagating further (`spec.md` GLOSSARY, "Rollback signal"). Caught
    /// by `Database::transaction`; never returned to a caller outside one.
    #[error("rollback")]
    Rollback,
}

pub type Result<T> = std::result::Result<T, DbError>;
