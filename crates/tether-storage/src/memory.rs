use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::{Storage, StorageError, check_quota};

/// In-process storage. Contents vanish with the value.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
    quota: Option<usize>,
    disabled: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Every subsequent operation fails with [`StorageError::Unavailable`].
    pub fn disable(&self) {
        self.disabled.set(true);
    }

    pub fn enable(&self) {
        self.disabled.set(false);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Successful `set_item` calls so far, including content-equal rewrites.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn ensure_enabled(&self) -> Result<(), StorageError> {
        if self.disabled.get() {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_enabled()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_enabled()?;
        let mut entries = self.entries.borrow_mut();
        check_quota(&entries, self.quota, key, value)?;
        entries.insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_enabled()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
