//! On-device cache of the paper index and the recently-viewed list.
//!
//! The cache assumes a single writer: `append` and `record_viewed` are
//! read-modify-write sequences and two concurrent callers can lose an update.
//! Failures never reach the caller; reads degrade to absent/empty and writes
//! become no-ops, with a warning logged.

/// In-memory key-value store.
pub mod memory;
/// redb-backed key-value store.
pub mod redb_store;
/// redb table definitions.
pub mod tables;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::constants::{MAX_RECENTLY_VIEWED, PAPERS_KEY, RECENTLY_VIEWED_KEY};
use crate::error::AppError;
use crate::models::Paper;
use std::sync::Arc;

/// Byte-oriented persistent key-value store.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error when the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error when the backing store cannot be written.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), AppError>;
}

/// Typed view over a [`KvStore`] holding paper lists.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KvStore>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Cache over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn read_list(&self, key: &str) -> Result<Option<Vec<Paper>>, AppError> {
        match self.store.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_list(&self, key: &str, papers: &[Paper]) -> Result<(), AppError> {
        let encoded = serde_json::to_vec(papers)?;
        self.store.put(key, &encoded)
    }

    /// Read the full paper index.
    ///
    /// # Returns
    /// `None` when nothing is cached or the cached value cannot be read.
    pub fn get(&self) -> Option<Vec<Paper>> {
        match self.read_list(PAPERS_KEY) {
            Ok(papers) => papers,
            Err(err) => {
                tracing::warn!("Failed to read papers from local cache: {}", err);
                None
            }
        }
    }

    /// Overwrite the full paper index.
    pub fn set(&self, papers: &[Paper]) {
        if let Err(err) = self.write_list(PAPERS_KEY, papers) {
            tracing::warn!("Failed to save papers to local cache: {}", err);
        }
    }

    /// Prepend one paper to the cached index.
    pub fn append(&self, paper: Paper) {
        let mut papers = Vec::with_capacity(1);
        papers.push(paper);
        papers.extend(self.get().unwrap_or_default());
        self.set(&papers);
    }

    /// Read the recently-viewed list, most recent first.
    pub fn recently_viewed(&self) -> Vec<Paper> {
        match self.read_list(RECENTLY_VIEWED_KEY) {
            Ok(papers) => papers.unwrap_or_default(),
            Err(err) => {
                tracing::warn!("Failed to read recently viewed from local cache: {}", err);
                Vec::new()
            }
        }
    }

    /// Move `paper` to the front of the recently-viewed list.
    ///
    /// Any entry with the same id is removed first and the list is capped at
    /// [`MAX_RECENTLY_VIEWED`] entries.
    ///
    /// # Returns
    /// The updated list, or the previously stored list if persisting fails.
    pub fn record_viewed(&self, paper: Paper) -> Vec<Paper> {
        let previous = self.recently_viewed();
        let mut viewed = Vec::with_capacity(MAX_RECENTLY_VIEWED);
        let id = paper.id.clone();
        viewed.push(paper);
        viewed.extend(previous.iter().filter(|p| p.id != id).cloned());
        viewed.truncate(MAX_RECENTLY_VIEWED);

        match self.write_list(RECENTLY_VIEWED_KEY, &viewed) {
            Ok(()) => viewed,
            Err(err) => {
                tracing::warn!("Failed to save recently viewed to local cache: {}", err);
                previous
            }
        }
    }
}
