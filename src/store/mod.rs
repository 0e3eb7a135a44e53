//! The backing store adapter contract (`spec.md` §4.2) and its two
//! implementations: [`memory::InMemoryStore`] (no file I/O, used by tests
//! and `StoreConfig::Memory`) and [`file::FileStore`] (grounded on the
//! teacher's `storage::persistence::{WalManager, SnapshotManager}`).

pub mod file;
pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::StoreValue;
use crate::core::Result;

pub use file::FileStore;
pub use memory::InMemoryStore;

/// One stored row: attribute name → column value. No synthetic `__rid__` is
/// carried at this layer because rows are compared structurally (a relation
/// is a set); the row id column `spec.md` §6 describes is an on-disk-only
/// implementation detail each adapter is free to manage internally.
pub type StoredRow = HashMap<String, StoreValue>;

pub type TraceFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Contract exposed to the catalog, mirroring `spec.md` §4.2's table
/// exactly. Single-writer: the adapter itself does not arbitrate between
/// concurrent callers, matching the Non-goal of multi-writer coordination.
pub trait StoreAdapter: Send {
    fn open(&mut self) -> Result<()>;
    fn create_rel(&mut self, name: &str, header: &[u8]) -> Result<()>;
    fn drop_rel(&mut self, name: &str) -> Result<()>;
    fn bulk_replace(&mut self, name: &str, rows: Vec<StoredRow>) -> Result<()>;
    fn insert_rows(&mut self, name: &str, rows: Vec<StoredRow>) -> Result<()>;
    fn delete_rows(&mut self, name: &str, rows: Vec<StoredRow>) -> Result<()>;
    fn load_rows(&mut self, name: &str) -> Result<Vec<StoredRow>>;
    fn relation_names(&mut self) -> Result<Vec<String>>;
    fn save_meta(&mut self, key: &str, bytes: Vec<u8>) -> Result<()>;
    fn load_meta(&mut self, key: &str) -> Result<Option<Vec<u8>>>;
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn set_trace(&mut self, trace: Option<TraceFn>);
}
