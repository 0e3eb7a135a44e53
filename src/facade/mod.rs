//! The per-client facade (`spec.md` §4.6/§6): the catalog as a named
//! container, constraint administration, and the transaction entry point.
//! Grounded in shape on the teacher's `facade::database::InMemoryDB` (one
//! struct owning catalog + store + namespace behind an `Arc`, cloned
//! cheaply per client) but rebuilt around this spec's nested transaction
//! model instead of the teacher's async MVCC facade.

mod relation_handle;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, instrument, warn};

use crate::catalog::{meta_constraints_key, meta_keys_key, meta_relations_key, Catalog, PersistentRelation};
use crate::codec::{self, StoreValue};
use crate::constraints;
use crate::core::{DbError, Result};
use crate::expr::{CompiledPredicate, Constructor, ExpressionNamespace};
use crate::identifier::validate_relation_name;
use crate::relation::{Header, RelationValue, Row};
use crate::store::{FileStore, InMemoryStore, StoreAdapter, StoredRow, TraceFn};
use crate::transaction::TransactionManager;

pub use relation_handle::{InsertValue, Relation};

/// How a `Database` persists. `spec.md` §6 describes a bare URI; this
/// facade prefers a typed configuration and offers [`StoreConfig::from_uri`]
/// as the literal-URI convenience the spec's external interface names.
pub enum StoreConfig {
    Memory,
    File { dir: PathBuf },
}

impl StoreConfig {
    pub fn from_uri(uri: &str) -> Result<Self> {
        if uri == "memory://" || uri == "memory:" {
            Ok(StoreConfig::Memory)
        } else if let Some(path) = uri.strip_prefix("file://") {
            Ok(StoreConfig::File { dir: PathBuf::from(path) })
        } else {
            Err(DbError::StoreError(format!("unrecognized store URI: '{uri}'")))
        }
    }

    fn open_adapter(self) -> Box<dyn StoreAdapter> {
        match self {
            StoreConfig::Memory => Box::new(InMemoryStore::new()),
            StoreConfig::File { dir } => Box::new(FileStore::new(dir)),
        }
    }
}

/// What `Database::set` binds a name to (`spec.md` §4.3).
pub enum SetInput {
    Header(Header),
    Value(RelationValue),
}

struct Inner {
    catalog: RwLock<Catalog>,
    store: std::sync::Mutex<Box<dyn StoreAdapter>>,
    txm: TransactionManager,
    namespace: RwLock<ExpressionNamespace>,
    closed: RwLock<bool>,
}

/// Per-client handle onto a database. Cheap to clone (`Arc`); every clone
/// shares the same catalog, store connection and transaction manager, but
/// the transaction manager keys frame stacks by thread, so two clones used
/// from two different threads behave as two independent clients
/// (`spec.md` §5).
#[derive(Clone)]
pub struct Database(Arc<Inner>);

impl Database {
    #[instrument(skip(config))]
    pub fn open(config: StoreConfig) -> Result<Self> {
        let mut store = config.open_adapter();
        store.open()?;
        let namespace = ExpressionNamespace::seeded();
        let mut catalog = Catalog::new();
        for name in store.relation_names()? {
            let rel = load_relation(store.as_mut(), &name, &namespace)?;
            catalog.set(name, rel);
        }
        info!(relations = catalog.names().count(), "database opened");
        Ok(Database(Arc::new(Inner {
            catalog: RwLock::new(catalog),
            store: std::sync::Mutex::new(store),
            txm: TransactionManager::new(),
            namespace: RwLock::new(namespace),
            closed: RwLock::new(false),
        })))
    }

    #[instrument(skip(self))]
    pub fn close(&self) -> Result<()> {
        let mut closed = self.0.closed.write().expect("closed flag lock poisoned");
        if *closed {
            return Ok(());
        }
        self.0.store.lock().expect("store lock poisoned").close()?;
        *closed = true;
        info!("database closed");
        Ok(())
    }

    pub fn set_trace(&self, trace: Option<TraceFn>) {
        self.0.store.lock().expect("store lock poisoned").set_trace(trace);
    }

    pub fn register_type(&self, tag: impl Into<String>, ctor: Constructor) {
        self.0.namespace.write().expect("namespace lock poisoned").register_constructor(tag, ctor);
    }

    fn ensure_open(&self) -> Result<()> {
        if *self.0.closed.read().expect("closed flag lock poisoned") {
            Err(DbError::Disconnected)
        } else {
            Ok(())
        }
    }

    fn current_view(&self, name: &str) -> Option<PersistentRelation> {
        let catalog = self.0.catalog.read().expect("catalog lock poisoned");
        self.0.txm.resolve(&catalog, name)
    }

    pub fn list_relations(&self) -> Result<Vec<(String, Header)>> {
        self.ensure_open()?;
        let catalog = self.0.catalog.read().expect("catalog lock poisoned");
        Ok(catalog.iter().map(|(name, rel)| (name.to_string(), rel.header.clone())).collect())
    }

    pub fn has(&self, name: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.current_view(name).is_some())
    }

    pub fn get(&self, name: &str) -> Result<RelationValue> {
        self.ensure_open()?;
        self.current_view(name).map(|r| r.value).ok_or_else(|| DbError::UnknownRelation(name.to_string()))
    }

    pub fn relation(&self, name: &str) -> Result<Relation> {
        self.ensure_open()?;
        if self.current_view(name).is_none() {
            return Err(DbError::UnknownRelation(name.to_string()));
        }
        Ok(Relation::new(self.clone(), name.to_string()))
    }

    #[instrument(skip(self, input))]
    pub fn set(&self, name: &str, input: SetInput) -> Result<()> {
        self.ensure_open()?;
        validate_relation_name(name)?;
        self.mutate(|db| {
            let existing = db.current_view(name);
            let rel = match (existing, input) {
                (None, SetInput::Header(h)) => PersistentRelation::new(h.clone(), RelationValue::empty(h)),
                (None, SetInput::Value(v)) => PersistentRelation::new(v.header().clone(), v),
                (Some(_), SetInput::Header(_)) => {
                    return Err(DbError::HeaderMismatch { relation: name.to_string() });
                }
                (Some(cur), SetInput::Value(v)) => {
                    if v.header() != &cur.header {
                        return Err(DbError::HeaderMismatch { relation: name.to_string() });
                    }
                    let ns = db.0.namespace.read().expect("namespace lock poisoned");
                    constraints::check_all_rows(&v, &cur.constraints, &ns)?;
                    constraints::check_key(&v, &cur.key)?;
                    PersistentRelation { value: v, ..cur }
                }
            };
            db.0.txm.put(name, rel);
            Ok(())
        })
    }

    #[instrument(skip(self))]
    pub fn remove(&self, name: &str) -> Result<()> {
        self.ensure_open()?;
        self.mutate(|db| {
            if db.current_view(name).is_none() {
                return Err(DbError::UnknownRelation(name.to_string()));
            }
            db.0.txm.remove(name);
            Ok(())
        })
    }

    pub fn row_constraints(&self, name: &str) -> Result<HashMap<String, String>> {
        self.ensure_open()?;
        let rel = self.current_view(name).ok_or_else(|| DbError::UnknownRelation(name.to_string()))?;
        Ok(rel.constraints.iter().map(|(k, v)| (k.clone(), v.source().to_string())).collect())
    }

    pub fn key(&self, name: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        let rel = self.current_view(name).ok_or_else(|| DbError::UnknownRelation(name.to_string()))?;
        Ok(rel.key.clone())
    }

    /// `constrain_rows(rel_name, name₁=src₁, …)` (`spec.md` §4.4).
    #[instrument(skip(self, predicates))]
    pub fn constrain_rows(&self, name: &str, predicates: &[(&str, &str)]) -> Result<()> {
        self.ensure_open()?;
        self.mutate(|db| {
            let mut rel = db.current_view(name).ok_or_else(|| DbError::UnknownRelation(name.to_string()))?;
            let mut compiled = Vec::with_capacity(predicates.len());
            for (cname, src) in predicates {
                reject_embedded_nul(src)?;
                compiled.push((cname.to_string(), constraints::compile(src)?));
            }
            let mut candidate_constraints = rel.constraints.clone();
            for (cname, predicate) in &compiled {
                candidate_constraints.insert(cname.clone(), predicate.clone());
            }
            let ns = db.0.namespace.read().expect("namespace lock poisoned");
            constraints::check_all_rows(&rel.value, &candidate_constraints, &ns)?;
            drop(ns);
            rel.constraints = candidate_constraints;
            db.0.txm.put(name, rel);
            Ok(())
        })
    }

    #[instrument(skip(self, names))]
    pub fn remove_row_constraints(&self, name: &str, names: &[&str]) -> Result<()> {
        self.ensure_open()?;
        self.mutate(|db| {
            let mut rel = db.current_view(name).ok_or_else(|| DbError::UnknownRelation(name.to_string()))?;
            for cname in names {
                if rel.constraints.remove(*cname).is_none() {
                    return Err(DbError::UnknownConstraint(cname.to_string(), name.to_string()));
                }
            }
            db.0.txm.put(name, rel);
            Ok(())
        })
    }

    #[instrument(skip(self, attrs))]
    pub fn set_key(&self, name: &str, attrs: &[&str]) -> Result<()> {
        self.ensure_open()?;
        self.mutate(|db| {
            let mut rel = db.current_view(name).ok_or_else(|| DbError::UnknownRelation(name.to_string()))?;
            for attr in attrs {
                if !rel.header.contains(attr) {
                    return Err(DbError::HeaderMismatch { relation: name.to_string() });
                }
            }
            let key: Vec<String> = attrs.iter().map(|s| s.to_string()).collect();
            constraints::check_key(&rel.value, &key)?;
            rel.key = key;
            db.0.txm.put(name, rel);
            Ok(())
        })
    }

    /// Runs `f` inside a new transaction frame (`spec.md` §4.6). A Rollback
    /// signal (`DbError::Rollback`) is caught here and does not propagate;
    /// every other error discards this frame's overlay and re-raises,
    /// cascading the rollback outward through any enclosing frame.
    #[instrument(skip(self, f))]
    pub fn transaction(&self, f: impl FnOnce(&Database) -> Result<()>) -> Result<()> {
        self.ensure_open()?;
        self.0.txm.push_frame();
        debug!(depth = self.0.txm.depth(), "transaction frame pushed");
        match f(self) {
            Ok(()) => match self.0.txm.pop_merge_or_return() {
                None => Ok(()),
                Some(overlay) => self.flush_overlay(overlay),
            },
            Err(DbError::Rollback) => {
                self.0.txm.pop_discard();
                debug!("transaction frame rolled back (explicit signal)");
                Ok(())
            }
            Err(other) => {
                self.0.txm.pop_discard();
                warn!(error = %other, "transaction frame rolled back on error");
                Err(other)
            }
        }
    }

    /// Wraps `f` in an implicit single-statement transaction when no
    /// transaction is already open on this thread (`spec.md` §4.5's "In all
    /// four, mutation is routed through the transaction manager").
    fn mutate(&self, f: impl FnOnce(&Database) -> Result<()>) -> Result<()> {
        let implicit = !self.0.txm.in_transaction();
        if implicit {
            self.0.txm.push_frame();
        }
        match f(self) {
            Ok(()) => {
                if implicit {
                    match self.0.txm.pop_merge_or_return() {
                        None => Ok(()),
                        Some(overlay) => self.flush_overlay(overlay),
                    }
                } else {
                    Ok(())
                }
            }
            Err(e) => {
                if implicit {
                    self.0.txm.pop_discard();
                }
                Err(e)
            }
        }
    }

    fn flush_overlay(&self, overlay: crate::transaction::Overlay) -> Result<()> {
        if overlay.is_empty() {
            return Ok(());
        }
        let mut store = self.0.store.lock().expect("store lock poisoned");
        store.begin()?;
        let outcome = flush_into_store(store.as_mut(), &overlay);
        match outcome {
            Ok(()) => {
                store.commit().map_err(|e| DbError::CommitFailed(e.to_string()))?;
                drop(store);
                let mut catalog = self.0.catalog.write().expect("catalog lock poisoned");
                for (name, entry) in overlay.iter() {
                    match entry {
                        Some(rel) => catalog.set(name.clone(), rel.clone()),
                        None => {
                            catalog.remove(name);
                        }
                    }
                }
                Ok(())
            }
            Err(e) => {
                let _ = store.rollback();
                Err(DbError::CommitFailed(e.to_string()))
            }
        }
    }
}

fn reject_embedded_nul(src: &str) -> Result<()> {
    if src.contains('\0') {
        Err(DbError::PredicateNotSerializable(format!(
            "predicate source contains an embedded NUL byte: {src:?}"
        )))
    } else {
        Ok(())
    }
}

fn flush_into_store(store: &mut dyn StoreAdapter, overlay: &crate::transaction::Overlay) -> Result<()> {
    for (name, entry) in overlay.iter() {
        match entry {
            None => store.drop_rel(name)?,
            Some(rel) => {
                let header_bytes = serde_json::to_vec(&rel.header)
                    .map_err(|e| DbError::StoreError(format!("encoding header: {e}")))?;
                store.create_rel(name, &header_bytes)?;
                store.save_meta(&meta_relations_key(name), header_bytes)?;
                let rows: Vec<StoredRow> = rel.value.iter().map(encode_row).collect();
                store.bulk_replace(name, rows)?;
                let constraint_srcs: HashMap<String, String> =
                    rel.constraints.iter().map(|(k, v)| (k.clone(), v.source().to_string())).collect();
                let constraints_bytes = serde_json::to_vec(&constraint_srcs)
                    .map_err(|e| DbError::StoreError(format!("encoding constraints: {e}")))?;
                store.save_meta(&meta_constraints_key(name), constraints_bytes)?;
                let key_bytes = serde_json::to_vec(&codec::encode_key(&rel.key))
                    .map_err(|e| DbError::StoreError(format!("encoding key: {e}")))?;
                store.save_meta(&meta_keys_key(name), key_bytes)?;
            }
        }
    }
    Ok(())
}

fn encode_row(row: &Row) -> StoredRow {
    row.iter().map(|(name, value)| (name.to_string(), codec::encode(value))).collect()
}

fn decode_row(stored: &StoredRow, header: &Header, namespace: &ExpressionNamespace) -> Result<Row> {
    let mut attrs = Vec::with_capacity(header.arity());
    for (name, attr_type) in header.iter() {
        let stored_value = stored.get(name).cloned().unwrap_or(StoreValue::Null);
        attrs.push((name.to_string(), codec::decode(&stored_value, attr_type, namespace)?));
    }
    Ok(Row::new(attrs))
}

fn load_relation(store: &mut dyn StoreAdapter, name: &str, namespace: &ExpressionNamespace) -> Result<PersistentRelation> {
    let header_bytes = store
        .load_meta(&meta_relations_key(name))?
        .ok_or_else(|| DbError::StoreError(format!("missing header metadata for '{name}'")))?;
    let header: Header =
        serde_json::from_slice(&header_bytes).map_err(|e| DbError::StoreError(format!("decoding header: {e}")))?;

    let stored_rows = store.load_rows(name)?;
    let mut rows = Vec::with_capacity(stored_rows.len());
    for stored in &stored_rows {
        rows.push(decode_row(stored, &header, namespace)?);
    }
    let value = RelationValue::new(header.clone(), rows)?;

    let constraints = match store.load_meta(&meta_constraints_key(name))? {
        Some(bytes) => {
            let srcs: HashMap<String, String> =
                serde_json::from_slice(&bytes).map_err(|e| DbError::StoreError(format!("decoding constraints: {e}")))?;
            let mut compiled = im::HashMap::new();
            for (cname, src) in srcs {
                compiled.insert(cname, CompiledPredicate::compile(src)?);
            }
            compiled
        }
        None => im::HashMap::new(),
    };

    let key: Vec<String> = match store.load_meta(&meta_keys_key(name))? {
        Some(bytes) => {
            serde_json::from_slice(&bytes).map_err(|e| DbError::StoreError(format!("decoding key: {e}")))?
        }
        None => Vec::new(),
    };

    Ok(PersistentRelation { header, value, key, constraints })
}
