use std::cell::RefCell;
use std::rc::Rc;

use crate::{remember, scoped_effect};

/// Cleanup returned by a keyed effect. Runs at most once.
pub struct Dispose(Box<dyn FnOnce()>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn run(self) {
        (self.0)()
    }
}

/// Runs `effect` on the first pass and whenever `key` differs from the
/// previous pass. Returns whether it ran.
///
/// The previous cleanup runs before the effect reruns, and the last cleanup
/// runs when the session ends.
pub fn disposable_effect<K: PartialEq + 'static>(
    key: K,
    effect: impl FnOnce() -> Dispose,
) -> bool {
    let last_key: Rc<RefCell<Option<K>>> = remember(|| RefCell::new(None));
    let cleanup: Rc<RefCell<Option<Dispose>>> = remember(|| RefCell::new(None));
    let installed = remember(|| RefCell::new(false));

    if !installed.replace(true) {
        let cleanup = cleanup.clone();
        scoped_effect(move || {
            let on_end: Box<dyn FnOnce()> = Box::new(move || {
                let last = cleanup.borrow_mut().take();
                if let Some(d) = last {
                    d.run();
                }
            });
            on_end
        });
    }

    if last_key.borrow().as_ref() == Some(&key) {
        return false;
    }
    *last_key.borrow_mut() = Some(key);

    let previous = cleanup.borrow_mut().take();
    if let Some(d) = previous {
        d.run();
    }
    let next = effect();
    *cleanup.borrow_mut() = Some(next);
    true
}
