use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

use tether_core::{Dispose, Signal, SubId, disposable_effect, remember, signal};

/// Where a tracked request stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status<T, E> {
    Idle,
    Pending,
    Resolved(T),
    Rejected(E),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusTag {
    Idle,
    Pending,
    Resolved,
    Rejected,
}

impl<T, E> Status<T, E> {
    pub fn tag(&self) -> StatusTag {
        match self {
            Self::Idle => StatusTag::Idle,
            Self::Pending => StatusTag::Pending,
            Self::Resolved(_) => StatusTag::Resolved,
            Self::Rejected(_) => StatusTag::Rejected,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Resolved(_) | Self::Rejected(_))
    }
}

struct Inner<T, E> {
    status: Status<T, E>,
    key: Option<String>,
    generation: u64,
}

/// Shared status of one request slot.
///
/// Only one request is tracked at a time. Starting a new one supersedes the
/// old one: its [`Ticket`] stops being current and whatever it settles with
/// is dropped.
pub struct RequestState<T: 'static, E: 'static> {
    inner: Rc<RefCell<Inner<T, E>>>,
    version: Signal<u64>,
}

impl<T: 'static, E: 'static> RequestState<T, E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                status: Status::Idle,
                key: None,
                generation: 0,
            })),
            version: signal(0),
        }
    }

    /// Moves to `Pending` for `key` and hands out the ticket that may settle it.
    pub fn start(&self, key: impl Into<String>) -> Ticket<T, E> {
        let key = key.into();
        let generation = {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            inner.status = Status::Pending;
            inner.key = Some(key.clone());
            inner.generation
        };
        log::debug!("request '{key}' pending (generation {generation})");
        self.bump();
        Ticket {
            generation,
            key,
            state: Rc::downgrade(&self.inner),
            version: self.version.clone(),
        }
    }

    /// Back to `Idle` with no key; outstanding tickets become stale.
    pub fn reset(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            inner.status = Status::Idle;
            inner.key = None;
        }
        self.bump();
    }

    /// Makes outstanding tickets stale without touching the status.
    pub fn cancel(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.generation += 1;
        log::debug!("request tickets before generation {} cancelled", inner.generation);
    }

    pub fn key(&self) -> Option<String> {
        self.inner.borrow().key.clone()
    }

    pub fn tag(&self) -> StatusTag {
        self.inner.borrow().status.tag()
    }

    pub fn status(&self) -> Status<T, E>
    where
        T: Clone,
        E: Clone,
    {
        self.inner.borrow().status.clone()
    }

    pub fn with_status<R>(&self, f: impl FnOnce(&Status<T, E>) -> R) -> R {
        f(&self.inner.borrow().status)
    }

    /// Calls `f` after every status change.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> SubId {
        self.version.subscribe(move |_| f())
    }

    pub fn unsubscribe(&self, id: SubId) -> bool {
        self.version.unsubscribe(id)
    }

    fn bump(&self) {
        self.version.update(|v| *v = v.wrapping_add(1));
    }
}

impl<T: 'static, E: 'static> Default for RequestState<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static, E: 'static> Clone for RequestState<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            version: self.version.clone(),
        }
    }
}

/// Permission to settle one specific request.
pub struct Ticket<T: 'static, E: 'static> {
    generation: u64,
    key: String,
    state: Weak<RefCell<Inner<T, E>>>,
    version: Signal<u64>,
}

impl<T: 'static, E: 'static> Ticket<T, E> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// False once a newer request started, the state was reset, or the state
    /// itself is gone.
    pub fn is_current(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|s| s.borrow().generation == self.generation)
    }

    /// Returns whether the value was applied.
    pub fn resolve(self, value: T) -> bool {
        self.settle(Status::Resolved(value))
    }

    /// Returns whether the error was applied.
    pub fn reject(self, error: E) -> bool {
        self.settle(Status::Rejected(error))
    }

    fn settle(self, status: Status<T, E>) -> bool {
        let Some(state) = self.state.upgrade() else {
            log::debug!("request '{}' settled after its state was dropped", self.key);
            return false;
        };
        {
            let mut inner = state.borrow_mut();
            if inner.generation != self.generation {
                log::debug!("dropping stale response for '{}'", self.key);
                return false;
            }
            log::debug!("request '{}' {:?}", self.key, status.tag());
            inner.status = status;
        }
        self.version.update(|v| *v = v.wrapping_add(1));
        true
    }
}

/// Tracks the request for `key` in the current session.
///
/// An empty key means "nothing requested": the state stays (or goes back to)
/// `Idle`. A changed non-empty key calls `start` with a fresh ticket; the same
/// key again does nothing, so a settled request is not refetched on every
/// pass. Tickets handed out for a key are cancelled when the key changes and
/// when the session ends.
pub fn remember_request<T: 'static, E: 'static>(
    key: &str,
    start: impl FnOnce(Ticket<T, E>),
) -> RequestState<T, E> {
    let state = (*remember(RequestState::<T, E>::new)).clone();

    disposable_effect(key.to_string(), || {
        if key.is_empty() {
            if state.key().is_some() {
                state.reset();
            }
        } else {
            start(state.start(key));
        }
        let state = state.clone();
        Dispose::new(move || state.cancel())
    });
    state
}

/// Drives `request` to completion on the current thread and settles `ticket`
/// with its outcome. Returns whether the outcome was applied.
pub fn block_on_request<T: 'static, E: 'static>(
    ticket: Ticket<T, E>,
    request: impl Future<Output = Result<T, E>>,
) -> bool {
    match pollster::block_on(request) {
        Ok(value) => ticket.resolve(value),
        Err(error) => ticket.reject(error),
    }
}
