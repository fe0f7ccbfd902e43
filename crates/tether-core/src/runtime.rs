use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::scope::Scope;

thread_local! {
    static ACTIVE: RefCell<Vec<Rc<RefCell<Composer>>>> = const { RefCell::new(Vec::new()) };
    // Used by `remember*` calls made outside of any session.
    static DETACHED: Rc<RefCell<Composer>> = Rc::new(RefCell::new(Composer::default()));
}

/// Slot storage for one session.
///
/// Positional slots are addressed by call order within a composition pass,
/// keyed slots by an explicit string.
#[derive(Default)]
pub struct Composer {
    pub slots: Vec<Box<dyn Any>>,
    pub cursor: usize,
    pub keyed_slots: HashMap<String, Box<dyn Any>>,
}

impl Composer {
    pub fn clear(&mut self) {
        self.slots.clear();
        self.keyed_slots.clear();
        self.cursor = 0;
    }
}

fn current_composer() -> Rc<RefCell<Composer>> {
    ACTIVE
        .with(|a| a.borrow().last().cloned())
        .unwrap_or_else(|| DETACHED.with(Rc::clone))
}

/// Runs `f` against the composer of the active session (or the detached one).
pub fn with_composer<R>(f: impl FnOnce(&mut Composer) -> R) -> R {
    let composer = current_composer();
    let mut c = composer.borrow_mut();
    f(&mut c)
}

/// One composition lifetime: the analogue of a mounted component tree.
///
/// Remembered slots live as long as the session. Ending (or dropping) the
/// session disposes its root scope, which runs every registered unmount
/// disposer.
pub struct Session {
    composer: Rc<RefCell<Composer>>,
    scope: Scope,
    passes: usize,
}

impl Session {
    pub fn new() -> Self {
        Self {
            composer: Rc::new(RefCell::new(Composer::default())),
            scope: Scope::new(),
            passes: 0,
        }
    }

    /// Runs one composition pass.
    ///
    /// The positional cursor restarts at zero, so the Nth `remember` call of
    /// this pass sees the value stored by the Nth call of the previous pass.
    pub fn compose<R>(&mut self, f: impl FnOnce() -> R) -> R {
        struct Pop;
        impl Drop for Pop {
            fn drop(&mut self) {
                ACTIVE.with(|a| {
                    a.borrow_mut().pop();
                });
            }
        }

        self.composer.borrow_mut().cursor = 0;
        self.passes += 1;
        ACTIVE.with(|a| a.borrow_mut().push(self.composer.clone()));
        let _pop = Pop;
        self.scope.run(f)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of composition passes run so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn end(self) {
        log::debug!("session ended after {} passes", self.passes);
        self.scope.clone().dispose();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    let composer = current_composer();

    let (cursor, fresh) = {
        let mut c = composer.borrow_mut();
        let cursor = c.cursor;
        c.cursor += 1;
        if let Some(rc) = c.slots.get(cursor).and_then(|s| s.downcast_ref::<Rc<T>>()) {
            return rc.clone();
        }
        let fresh = cursor >= c.slots.len();
        if fresh {
            // reserve the position; `init` may remember things of its own
            c.slots.push(Box::new(()));
        }
        (cursor, fresh)
    };

    let rc: Rc<T> = Rc::new(init());

    if !fresh {
        log::warn!(
            "remember: slot {} type changed; replacing. \
             If this is due to conditional composition, prefer remember_with_key.",
            cursor
        );
    }
    composer.borrow_mut().slots[cursor] = Box::new(rc.clone());
    rc
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let composer = current_composer();
    let key = key.into();

    {
        let c = composer.borrow();
        if let Some(existing) = c.keyed_slots.get(&key) {
            if let Some(rc) = existing.downcast_ref::<Rc<T>>() {
                return rc.clone();
            }
            log::warn!(
                "remember_with_key: key '{}' reused with a different type; replacing.",
                key
            );
        }
    }

    let rc: Rc<T> = Rc::new(init());
    composer.borrow_mut().keyed_slots.insert(key, Box::new(rc.clone()));
    rc
}

pub fn remember_state<T: 'static>(init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
    remember(|| RefCell::new(init()))
}

pub fn remember_state_with_key<T: 'static>(
    key: impl Into<String>,
    init: impl FnOnce() -> T,
) -> Rc<RefCell<T>> {
    remember_with_key(key, || RefCell::new(init()))
}

/// Forgets a keyed slot in the active session. Returns whether it existed.
pub fn forget_key(key: &str) -> bool {
    with_composer(|c| c.keyed_slots.remove(key).is_some())
}
