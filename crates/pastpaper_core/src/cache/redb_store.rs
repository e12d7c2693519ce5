//! Persistent key-value store backed by a single redb file.

use super::{tables::ENTRIES, KvStore};
use crate::error::AppError;
use redb::ReadableDatabase;
use std::path::Path;
use std::sync::Arc;

/// redb-backed [`KvStore`].
pub struct RedbStore {
    db: Arc<redb::Database>,
}

impl RedbStore {
    /// Open (or create) the cache file and its table.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or the table initialized.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = redb::Database::create(path)?;
        let write_txn = db.begin_write()?;
        write_txn.open_table(ENTRIES)?;
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let read_txn = self.db.begin_read()?;
        let entries = read_txn.open_table(ENTRIES)?;
        let value = entries.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), AppError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut entries = write_txn.open_table(ENTRIES)?;
            entries.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
