//! Durable key-value backing store.
//!
//! # Responsibility
//! - Define the synchronous string-keyed store every aggregate persists into.
//! - Provide SQLite-backed and in-memory implementations.
//! - Offer typed, timestamped envelope helpers on top of raw values.
//!
//! # Invariants
//! - Values are opaque text; the store never interprets them.
//! - One key is written by exactly one logical owner.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod item;
mod memory;
mod sqlite;

pub use item::{
    clear_items, get_item, has_item, item_timestamp, remove_item, set_item, StorageItem,
};
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    Encoding(serde_json::Error),
    QuotaExceeded { key: String, limit_bytes: usize },
    LockPoisoned,
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encoding(err) => write!(f, "stored value encoding error: {err}"),
            Self::QuotaExceeded { key, limit_bytes } => {
                write!(f, "quota of {limit_bytes} bytes exceeded writing `{key}`")
            }
            Self::LockPoisoned => write!(f, "backing store lock poisoned"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::QuotaExceeded { .. } | Self::LockPoisoned => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value)
    }
}

/// Synchronous string-keyed text store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
    fn clear(&self) -> StorageResult<()>;

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
