use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_core::remember;

struct BoundaryState<E> {
    error: Option<Rc<E>>,
    reset_keys: Option<Vec<String>>,
    on_reset: Option<Rc<dyn Fn()>>,
}

/// Catches a failed render and shows a fallback until reset.
///
/// Content reports failure by returning `Err`. Once caught, the error sticks:
/// later passes render the fallback without running the content, until
/// [`reset`](Self::reset) is called (usually through the [`ResetHandle`]
/// given to the fallback) or the reset keys change.
pub struct ErrorBoundary<E: 'static> {
    inner: Rc<RefCell<BoundaryState<E>>>,
}

/// Clears the boundary it came from. Does nothing once the boundary is gone.
#[derive(Clone)]
pub struct ResetHandle {
    reset: Rc<dyn Fn()>,
}

impl ResetHandle {
    pub fn reset(&self) {
        (self.reset)()
    }
}

impl<E: 'static> ErrorBoundary<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BoundaryState {
                error: None,
                reset_keys: None,
                on_reset: None,
            })),
        }
    }

    /// Runs on explicit resets, before the error is cleared.
    pub fn on_reset(&self, f: impl Fn() + 'static) {
        self.inner.borrow_mut().on_reset = Some(Rc::new(f));
    }

    pub fn render<V>(
        &self,
        reset_keys: &[&str],
        content: impl FnOnce() -> Result<V, E>,
        fallback: impl FnOnce(&E, ResetHandle) -> V,
    ) -> V {
        let keys: Vec<String> = reset_keys.iter().map(|k| k.to_string()).collect();
        let keys_changed = {
            let mut state = self.inner.borrow_mut();
            let changed = state.reset_keys.as_ref().is_some_and(|prev| *prev != keys);
            state.reset_keys = Some(keys);
            changed
        };
        if keys_changed && self.has_error() {
            log::debug!("error boundary reset by key change");
            self.clear();
        }

        if let Some(error) = self.error() {
            return fallback(&error, self.reset_handle());
        }

        match content() {
            Ok(view) => view,
            Err(error) => {
                log::debug!("error boundary caught a failed render");
                let error = Rc::new(error);
                self.inner.borrow_mut().error = Some(error.clone());
                fallback(&error, self.reset_handle())
            }
        }
    }

    /// Runs `on_reset`, then clears the caught error.
    pub fn reset(&self) {
        Self::reset_inner(&self.inner);
    }

    pub fn error(&self) -> Option<Rc<E>> {
        self.inner.borrow().error.clone()
    }

    pub fn has_error(&self) -> bool {
        self.inner.borrow().error.is_some()
    }

    pub fn reset_handle(&self) -> ResetHandle {
        let weak: Weak<RefCell<BoundaryState<E>>> = Rc::downgrade(&self.inner);
        ResetHandle {
            reset: Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Self::reset_inner(&inner);
                }
            }),
        }
    }

    fn clear(&self) {
        self.inner.borrow_mut().error = None;
    }

    fn reset_inner(inner: &Rc<RefCell<BoundaryState<E>>>) {
        let on_reset = inner.borrow().on_reset.clone();
        if let Some(on_reset) = on_reset {
            on_reset();
        }
        inner.borrow_mut().error = None;
    }
}

impl<E: 'static> Default for ErrorBoundary<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> Clone for ErrorBoundary<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// One boundary per call site in the current session.
pub fn remember_error_boundary<E: 'static>() -> ErrorBoundary<E> {
    (*remember(ErrorBoundary::<E>::new)).clone()
}
