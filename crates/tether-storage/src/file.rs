use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{Storage, StorageConfig, StorageError, check_quota};

/// Slots kept in one JSON object on disk.
///
/// The document is read on first access and cached. Every mutation writes a
/// complete new document to a sibling temp file and renames it over the old
/// one, so a crash never leaves a half-written file behind. Other processes
/// writing the same file are not coordinated with; last write wins.
pub struct FileStorage {
    path: PathBuf,
    quota: Option<usize>,
    entries: RefCell<Option<BTreeMap<String, String>>>,
}

impl FileStorage {
    /// Creates the directory if needed. The file itself is created lazily.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.dir).map_err(|e| StorageError::io(&config.dir, e))?;
        let path = config.path();
        log::debug!("file storage at {}", path.display());
        Ok(Self {
            path,
            quota: config.quota_bytes,
            entries: RefCell::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drops the cache so the next access rereads the file.
    pub fn reload(&self) {
        self.entries.borrow_mut().take();
    }

    fn with_entries<R>(
        &self,
        f: impl FnOnce(&BTreeMap<String, String>) -> R,
    ) -> Result<R, StorageError> {
        let mut cache = self.entries.borrow_mut();
        let entries = match cache.take() {
            Some(entries) => entries,
            None => load(&self.path)?,
        };
        let out = f(&entries);
        *cache = Some(entries);
        Ok(out)
    }

    /// Applies `change` to a copy, persists it, then swaps it into the cache.
    /// A failed write leaves both the file and the cache untouched.
    fn mutate(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>) -> Result<bool, StorageError>,
    ) -> Result<(), StorageError> {
        let mut next = self.with_entries(BTreeMap::clone)?;
        if !change(&mut next)? {
            return Ok(());
        }
        save(&self.path, &next)?;
        *self.entries.borrow_mut() = Some(next);
        Ok(())
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn save(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let body = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(&tmp, body).map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            check_quota(entries, self.quota, key, value)?;
            entries.insert(key.to_string(), value.to_string());
            Ok(true)
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|entries| Ok(entries.remove(key).is_some()))
    }
}
