use std::cell::RefCell;
use std::rc::Rc;

use tether_core::{local, remember, with_local};
use tether_storage::SharedStorage;

use crate::{DefaultValue, PersistError, PersistOptions, PersistentState, StateSetter};

type Slot<T> = RefCell<Option<Rc<RefCell<PersistentState<T>>>>>;

/// Provides `storage` to every persisted-state hook composed inside `f`.
pub fn with_storage<R>(storage: SharedStorage, f: impl FnOnce() -> R) -> R {
    with_local(storage, f)
}

/// Persisted counterpart of `remember_state`, using the storage provided by
/// [`with_storage`].
///
/// The first pass reads the slot (or resolves `default`) and writes it back.
/// Later passes reuse the same handle: `default` is ignored, and a changed
/// `key` or codec migrates or rewrites the slot before returning.
///
/// ```rust
/// use std::rc::Rc;
/// use tether_core::Session;
/// use tether_persist::{PersistOptions, remember_persistent_state, with_storage};
/// use tether_storage::{MemoryStorage, SharedStorage, Storage};
///
/// let storage: SharedStorage = Rc::new(MemoryStorage::new());
/// let mut session = Session::new();
///
/// let set_name = with_storage(storage.clone(), || {
///     session.compose(|| {
///         let (name, set_name): (String, _) =
///             remember_persistent_state("name", "", PersistOptions::json()).unwrap();
///         assert_eq!(name, "");
///         set_name
///     })
/// });
/// set_name.set("Ada".to_string()).unwrap();
/// assert_eq!(storage.get_item("name").unwrap().as_deref(), Some("\"Ada\""));
/// ```
pub fn remember_persistent_state<T: Clone + 'static>(
    key: &str,
    default: impl Into<DefaultValue<T>>,
    options: PersistOptions<T>,
) -> Result<(T, StateSetter<T>), PersistError> {
    let storage = local::<SharedStorage>().ok_or(PersistError::NoStorage)?;
    remember_persistent_state_in(storage, key, default, options)
}

/// Like [`remember_persistent_state`] with an explicit storage handle.
///
/// The storage is only consulted on the first pass; the handle keeps it.
pub fn remember_persistent_state_in<T: Clone + 'static>(
    storage: SharedStorage,
    key: &str,
    default: impl Into<DefaultValue<T>>,
    options: PersistOptions<T>,
) -> Result<(T, StateSetter<T>), PersistError> {
    let slot: Rc<Slot<T>> = remember(|| RefCell::new(None));

    let existing = slot.borrow().clone();
    let handle = match existing {
        Some(handle) => {
            handle.borrow_mut().rebind(key, options)?;
            handle
        }
        None => {
            // A failed first pass leaves the slot empty, so the next pass retries.
            let handle = Rc::new(RefCell::new(PersistentState::new(
                storage, key, default, options,
            )?));
            *slot.borrow_mut() = Some(handle.clone());
            handle
        }
    };

    let value = handle.borrow().value().clone();
    Ok((value, StateSetter::new(&handle)))
}
