//! # Durable key-value slots
//!
//! A [`Storage`] holds string values under string keys, one value per slot,
//! and outlives the sessions that write to it. Two backends ship here:
//!
//! - [`MemoryStorage`]: process-local map, for tests and throwaway runs.
//! - [`FileStorage`]: a single JSON document on disk that survives restarts.
//!
//! Both enforce an optional byte quota the way browser storage does: the sum
//! of every key and value length may not exceed it.
//!
//! ```rust
//! use tether_storage::{MemoryStorage, Storage};
//!
//! let store = MemoryStorage::new();
//! store.set_item("name", "\"Ada\"").unwrap();
//! assert_eq!(store.get_item("name").unwrap().as_deref(), Some("\"Ada\""));
//! store.remove_item("name").unwrap();
//! assert!(!store.contains_key("name").unwrap());
//! ```
//!
//! All access is synchronous and single-threaded; handles are shared as
//! [`SharedStorage`].

use std::collections::BTreeMap;
use std::rc::Rc;

mod config;
mod error;
mod file;
mod memory;
mod tests;

pub use config::{DEFAULT_QUOTA_BYTES, StorageConfig};
pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Synchronous string key-value store.
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get_item(key)?.is_some())
    }
}

pub type SharedStorage = Rc<dyn Storage>;

impl<S: Storage + ?Sized> Storage for Rc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

/// Rejects `key = value` if it would push `entries` past `quota` bytes.
pub(crate) fn check_quota(
    entries: &BTreeMap<String, String>,
    quota: Option<usize>,
    key: &str,
    value: &str,
) -> Result<(), StorageError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let others: usize = entries
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
    let needed = others + key.len() + value.len();
    if needed > quota {
        return Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            needed,
            quota,
        });
    }
    Ok(())
}
