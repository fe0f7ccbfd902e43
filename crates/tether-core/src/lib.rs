//! # Sessions, Slots, and Effects
//!
//! Tether keeps component state in a small single-threaded runtime. There
//! are four main pieces:
//!
//! - `Session`: one composition lifetime (the analogue of a mount).
//! - `remember*`: slots bound to the session that survive between passes.
//! - `Signal<T>`: observable value with subscribers.
//! - `disposable_effect`: a side effect keyed on its inputs, with cleanup
//!   before each rerun and when the session ends.
//!
//! ## Sessions and remembered state
//!
//! ```rust
//! use tether_core::*;
//!
//! fn counter() -> i32 {
//!     let count = remember_state(|| 0);
//!     *count.borrow_mut() += 1;
//!     let v = *count.borrow();
//!     v
//! }
//!
//! let mut session = Session::new();
//! assert_eq!(session.compose(counter), 1);
//! assert_eq!(session.compose(counter), 2);
//! ```
//!
//! - `remember` and `remember_state` are order-based: the Nth call in a pass
//!   always refers to the Nth stored value.
//! - `remember_with_key` and `remember_state_with_key` are key-based and
//!   stable across conditional branches.
//!
//! ## Effects and cleanup
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//! use tether_core::*;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let mut session = Session::new();
//! for key in ["a", "a", "b"] {
//!     let log = log.clone();
//!     session.compose(move || {
//!         disposable_effect(key, || {
//!             log.borrow_mut().push(format!("open {key}"));
//!             Dispose::new(move || log.borrow_mut().push(format!("close {key}")))
//!         });
//!     });
//! }
//! session.end();
//! assert_eq!(*log.borrow(), ["open a", "close a", "open b", "close b"]);
//! ```
//!
//! The key is compared against the previous pass, so the effect only reruns
//! when an input actually changed.

pub mod effects;
pub mod locals;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;

pub use effects::*;
pub use locals::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
