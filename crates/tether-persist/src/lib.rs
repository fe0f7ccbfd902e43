//! # Persisted state
//!
//! State that survives restarts by mirroring itself into a durable
//! key-value slot ([`tether_storage::Storage`]).
//!
//! - [`PersistentState`] is the handle: it owns the in-memory value, the
//!   bound key and the codec, and synchronizes the slot after every commit.
//! - [`remember_persistent_state`] keeps one handle per call site in the
//!   current `Session`, the way `remember_state` keeps plain values.
//! - [`Codec`] is the serialize/deserialize pair. [`JsonCodec`] is the
//!   default; [`FnCodec`] wraps two closures.
//!
//! Changing the key a handle is bound to moves the slot: the old key is
//! removed before the new one is written, so renames never leave duplicates.
//!
//! ```rust
//! use std::rc::Rc;
//! use tether_persist::{PersistOptions, PersistentState};
//! use tether_storage::{MemoryStorage, SharedStorage, Storage};
//!
//! let storage: SharedStorage = Rc::new(MemoryStorage::new());
//! let mut count =
//!     PersistentState::new(storage.clone(), "count", 0u32, PersistOptions::json()).unwrap();
//! count.update(|n| n + 1).unwrap();
//! count.set_key("clicks").unwrap();
//!
//! assert_eq!(storage.get_item("count").unwrap(), None);
//! assert_eq!(storage.get_item("clicks").unwrap().as_deref(), Some("1"));
//! ```

mod codec;
mod error;
mod hook;
mod options;
mod state;
mod tests;

pub use codec::{Codec, CodecError, FnCodec, JsonCodec};
pub use error::PersistError;
pub use hook::{remember_persistent_state, remember_persistent_state_in, with_storage};
pub use options::{CorruptPolicy, DefaultValue, PersistOptions};
pub use state::{PersistentState, StateSetter};
