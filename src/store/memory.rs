use std::collections::HashMap;

use crate::core::Result;

use super::{StoreAdapter, StoredRow, TraceFn};

/// No-file-I/O store, used by unit tests and `StoreConfig::Memory`. Keeps
/// everything in plain `HashMap`s; `close()` discards all state, matching
/// the "in-memory only" contract.
#[derive(Default)]
pub struct InMemoryStore {
    rels: HashMap<String, Vec<StoredRow>>,
    headers: HashMap<String, Vec<u8>>,
    meta: HashMap<String, Vec<u8>>,
    trace: Option<TraceFn>,
    open: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&self, line: impl Into<String>) {
        if let Some(trace) = &self.trace {
            trace(&line.into());
        }
    }
}

impl StoreAdapter for InMemoryStore {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        self.emit("OPEN memory");
        Ok(())
    }

    fn create_rel(&mut self, name: &str, header: &[u8]) -> Result<()> {
        self.emit(format!("CREATE_REL {name}"));
        self.rels.entry(name.to_string()).or_default();
        self.headers.insert(name.to_string(), header.to_vec());
        Ok(())
    }

    fn drop_rel(&mut self, name: &str) -> Result<()> {
        self.emit(format!("DROP_REL {name}"));
        self.rels.remove(name);
        self.headers.remove(name);
        Ok(())
    }

    fn bulk_replace(&mut self, name: &str, rows: Vec<StoredRow>) -> Result<()> {
        self.emit(format!("BULK_REPLACE {name} ({} rows)", rows.len()));
        self.rels.insert(name.to_string(), rows);
        Ok(())
    }

    fn insert_rows(&mut self, name: &str, rows: Vec<StoredRow>) -> Result<()> {
        self.emit(format!("INSERT_ROWS {name} ({} rows)", rows.len()));
        self.rels.entry(name.to_string()).or_default().extend(rows);
        Ok(())
    }

    fn delete_rows(&mut self, name: &str, rows: Vec<StoredRow>) -> Result<()> {
        self.emit(format!("DELETE_ROWS {name} ({} rows)", rows.len()));
        if let Some(existing) = self.rels.get_mut(name) {
            existing.retain(|r| !rows.contains(r));
        }
        Ok(())
    }

    fn load_rows(&mut self, name: &str) -> Result<Vec<StoredRow>> {
        Ok(self.rels.get(name).cloned().unwrap_or_default())
    }

    fn relation_names(&mut self) -> Result<Vec<String>> {
        Ok(self.rels.keys().cloned().collect())
    }

    fn save_meta(&mut self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.meta.insert(key.to_string(), bytes);
        Ok(())
    }

    fn load_meta(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.meta.get(key).cloned())
    }

    fn begin(&mut self) -> Result<()> {
        self.emit("BEGIN");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.emit("COMMIT");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.emit("ROLLBACK");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        self.emit("CLOSE");
        Ok(())
    }

    fn set_trace(&mut self, trace: Option<TraceFn>) {
        self.trace = trace;
    }
}
