use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tether_storage::{SharedStorage, Storage};

use crate::{CorruptPolicy, DefaultValue, PersistError, PersistOptions};

/// A value mirrored into one storage slot.
///
/// Every commit (`set`, `update`, a key or codec change) is followed by a
/// synchronization step that
///
/// 1. removes the slot at the previously synchronized key if the key moved,
/// 2. records the current key,
/// 3. writes the encoded value to the current key, even if unchanged.
///
/// The in-memory value is committed first; a storage failure during the
/// following sync is returned to the caller but does not roll it back.
/// Dropping the handle leaves the last written slot in place.
pub struct PersistentState<T> {
    storage: SharedStorage,
    key: String,
    synced_key: Option<String>,
    // set until a sync completes
    dirty: bool,
    value: T,
    options: PersistOptions<T>,
}

impl<T> PersistentState<T> {
    /// Reads `key` once and writes the resolved value back.
    ///
    /// A missing or empty slot resolves `default`; anything else is decoded
    /// with the options' codec, failing per [`CorruptPolicy`].
    pub fn new(
        storage: SharedStorage,
        key: impl Into<String>,
        default: impl Into<DefaultValue<T>>,
        options: PersistOptions<T>,
    ) -> Result<Self, PersistError> {
        let key = key.into();
        let value = match read_slot(&*storage, &key, &options)? {
            Some(stored) => stored,
            None => default.into().resolve(),
        };

        let mut state = Self {
            storage,
            key,
            synced_key: None,
            dirty: true,
            value,
            options,
        };
        state.sync()?;
        Ok(state)
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> &PersistOptions<T> {
        &self.options
    }

    pub fn set(&mut self, value: T) -> Result<(), PersistError> {
        self.value = value;
        self.sync()
    }

    pub fn update(&mut self, f: impl FnOnce(&T) -> T) -> Result<(), PersistError> {
        let next = f(&self.value);
        self.set(next)
    }

    /// Moves the value to a new slot.
    ///
    /// Re-passing the current key is a no-op once the slot is in sync; after
    /// a failed sync it retries the migration.
    pub fn set_key(&mut self, key: impl Into<String>) -> Result<(), PersistError> {
        self.key = key.into();
        self.sync_if_stale()
    }

    /// Swaps options; re-syncs if the codec changed identity.
    pub fn set_options(&mut self, options: PersistOptions<T>) -> Result<(), PersistError> {
        if !self.options.same_codec(&options) {
            self.dirty = true;
        }
        self.options = options;
        self.sync_if_stale()
    }

    /// Applies a key and options in one step, syncing at most once.
    pub fn rebind(&mut self, key: &str, options: PersistOptions<T>) -> Result<(), PersistError> {
        if key != self.key {
            self.key = key.to_string();
        }
        if !self.options.same_codec(&options) {
            self.dirty = true;
        }
        self.options = options;
        self.sync_if_stale()
    }

    /// Whether the slot may not reflect the current key, codec and value.
    pub fn is_stale(&self) -> bool {
        self.dirty || self.synced_key.as_deref() != Some(self.key.as_str())
    }

    fn sync_if_stale(&mut self) -> Result<(), PersistError> {
        if self.is_stale() {
            self.sync()?;
        }
        Ok(())
    }

    pub fn sync(&mut self) -> Result<(), PersistError> {
        self.dirty = true;
        if let Some(prev) = self.synced_key.as_deref()
            && prev != self.key
        {
            log::debug!("migrating slot '{}' -> '{}'", prev, self.key);
            self.storage.remove_item(prev)?;
        }
        self.synced_key = Some(self.key.clone());

        let encoded = self
            .options
            .codec()
            .encode(&self.value)
            .map_err(|source| PersistError::Encode {
                key: self.key.clone(),
                source,
            })?;
        self.storage.set_item(&self.key, &encoded)?;
        self.dirty = false;
        log::trace!("synced slot '{}' ({} bytes)", self.key, encoded.len());
        Ok(())
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentState")
            .field("key", &self.key)
            .field("synced_key", &self.synced_key)
            .field("dirty", &self.dirty)
            .field("value", &self.value)
            .field("options", &self.options)
            .finish()
    }
}

fn read_slot<T>(
    storage: &dyn Storage,
    key: &str,
    options: &PersistOptions<T>,
) -> Result<Option<T>, PersistError> {
    // An empty string counts as "nothing stored".
    let Some(raw) = storage.get_item(key)?.filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    match options.codec().decode(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(source) => match options.corrupt_policy() {
            CorruptPolicy::Propagate => Err(PersistError::Decode {
                key: key.to_string(),
                source,
            }),
            CorruptPolicy::UseDefault => {
                log::warn!("discarding undecodable value at '{key}': {source}");
                Ok(None)
            }
        },
    }
}

/// Writes to a [`PersistentState`] owned by a session.
///
/// Holds the state weakly: once the owning session is gone, writes are
/// dropped with a warning instead of resurrecting the slot.
pub struct StateSetter<T> {
    state: Weak<RefCell<PersistentState<T>>>,
}

impl<T> StateSetter<T> {
    pub fn new(state: &Rc<RefCell<PersistentState<T>>>) -> Self {
        Self {
            state: Rc::downgrade(state),
        }
    }

    pub fn set(&self, value: T) -> Result<(), PersistError> {
        self.update(move |_| value)
    }

    /// Computes the next value from the previous one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<(), PersistError> {
        match self.state.upgrade() {
            Some(state) => state.borrow_mut().update(f),
            None => {
                log::warn!("state setter used after its session ended; ignoring");
                Ok(())
            }
        }
    }

    pub fn is_live(&self) -> bool {
        self.state.strong_count() > 0
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}
