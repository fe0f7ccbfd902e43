use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Codec, JsonCodec};

/// Initial value used when the slot is empty.
pub enum DefaultValue<T> {
    Value(T),
    /// Called at most once, and only if the slot is empty.
    Lazy(Box<dyn FnOnce() -> T>),
}

impl<T> DefaultValue<T> {
    pub fn lazy(f: impl FnOnce() -> T + 'static) -> Self {
        Self::Lazy(Box::new(f))
    }

    pub fn resolve(self) -> T {
        match self {
            Self::Value(v) => v,
            Self::Lazy(f) => f(),
        }
    }
}

impl<T> From<T> for DefaultValue<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for DefaultValue<String> {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl<T: fmt::Debug> fmt::Debug for DefaultValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// What to do when the stored value can't be decoded at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorruptPolicy {
    /// Fail initialization with `PersistError::Decode`.
    #[default]
    Propagate,
    /// Log a warning and start from the default; the first sync overwrites
    /// the bad slot.
    UseDefault,
}

/// Codec and decode-failure policy for one persisted value.
pub struct PersistOptions<T> {
    codec: Rc<dyn Codec<T>>,
    json: bool,
    on_corrupt: CorruptPolicy,
}

impl<T: Serialize + DeserializeOwned + 'static> PersistOptions<T> {
    pub fn json() -> Self {
        Self {
            codec: Rc::new(JsonCodec),
            json: true,
            on_corrupt: CorruptPolicy::default(),
        }
    }
}

impl<T: Serialize + DeserializeOwned + 'static> Default for PersistOptions<T> {
    fn default() -> Self {
        Self::json()
    }
}

impl<T: 'static> PersistOptions<T> {
    pub fn with_codec(codec: impl Codec<T> + 'static) -> Self {
        Self::with_shared_codec(Rc::new(codec))
    }

    /// Reusing one `Rc` across passes keeps the codec's identity stable, so
    /// passing it again does not count as a codec change.
    pub fn with_shared_codec(codec: Rc<dyn Codec<T>>) -> Self {
        Self {
            codec,
            json: false,
            on_corrupt: CorruptPolicy::default(),
        }
    }
}

impl<T> PersistOptions<T> {
    pub fn on_corrupt(mut self, policy: CorruptPolicy) -> Self {
        self.on_corrupt = policy;
        self
    }

    pub fn corrupt_policy(&self) -> CorruptPolicy {
        self.on_corrupt
    }

    pub fn codec(&self) -> &dyn Codec<T> {
        &*self.codec
    }

    /// Codec identity: every default JSON codec is the same codec; custom
    /// codecs are the same only if they share an allocation.
    pub fn same_codec(&self, other: &Self) -> bool {
        (self.json && other.json) || Rc::ptr_eq(&self.codec, &other.codec)
    }
}

impl<T> Clone for PersistOptions<T> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            json: self.json,
            on_corrupt: self.on_corrupt,
        }
    }
}

impl<T> fmt::Debug for PersistOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistOptions")
            .field("codec", &if self.json { "json" } else { "custom" })
            .field("on_corrupt", &self.on_corrupt)
            .finish()
    }
}
