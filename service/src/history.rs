//! Advisory record of recent submissions. The chain is the source of truth;
//! this list only exists so the user can find their transactions again.

use std::{
    collections::HashMap,
    path::Path,
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use redb::{Database, ReadableDatabase, TableDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HISTORY_KEY: &str = "txHistory";
pub const HISTORY_LIMIT: usize = 10;

/// Database file created under the data directory.
pub const HISTORY_DB_FILE: &str = "geneforge.redb";

const LOCAL_STORAGE: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("local_storage");

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Database error: {0}")]
    DatabaseCreate(#[from] redb::DatabaseError),

    #[error("Database commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Database transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("History is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub description: String,
}

impl TransactionRecord {
    pub fn now(hash: impl Into<String>, description: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            hash: hash.into(),
            timestamp,
            description: description.into(),
        }
    }
}

/// String key/value store with browser `localStorage` semantics.
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>, HistoryError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), HistoryError>;
    fn remove_item(&self, key: &str) -> Result<(), HistoryError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, HistoryError> {
        self.items.lock().map_err(|_| HistoryError::Poisoned)
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, HistoryError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), HistoryError> {
        self.items()?.remove(key);
        Ok(())
    }
}

/// `localStorage` table in a redb database. Every write is its own committed
/// transaction, so an interrupted write leaves the previous value in place.
pub struct RedbStorage {
    db: Database,
}

impl RedbStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;
        let write_txn = db.begin_write()?;
        {
            let _table = write_txn.open_table(LOCAL_STORAGE)?;
        }
        write_txn.commit()?;

        tracing::debug!("Opened history store at {}", path.display());
        Ok(Self { db })
    }

    /// Opens `<dir>/geneforge.redb`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, HistoryError> {
        Self::open(dir.as_ref().join(HISTORY_DB_FILE))
    }
}

impl Storage for RedbStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, HistoryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCAL_STORAGE)?;
        let value = table.get(key)?.map(|value| value.value().to_string());
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LOCAL_STORAGE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), HistoryError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LOCAL_STORAGE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Newest-first list of the last [`HISTORY_LIMIT`] submissions.
///
/// Single writer: callers record from the one task that handles user actions.
pub struct TransactionHistory<S> {
    storage: S,
}

impl<S: Storage> TransactionHistory<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    fn stored(&self) -> Result<Vec<TransactionRecord>, HistoryError> {
        match self.storage.get_item(HISTORY_KEY)? {
            // A blank value reads as an empty list.
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(&json)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Saved history, or an empty list if it cannot be read.
    pub fn load(&self) -> Vec<TransactionRecord> {
        self.stored().unwrap_or_else(|e| {
            tracing::warn!("Error loading transaction history: {}", e);
            Vec::new()
        })
    }

    pub fn record(&self, record: TransactionRecord) -> Result<Vec<TransactionRecord>, HistoryError> {
        let mut history = self.stored()?;
        history.insert(0, record);
        history.truncate(HISTORY_LIMIT);
        self.storage
            .set_item(HISTORY_KEY, &serde_json::to_string(&history)?)?;
        Ok(history)
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        self.storage.remove_item(HISTORY_KEY)
    }
}
