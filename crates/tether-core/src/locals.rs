//! # Composition locals
//!
//! Thread-local values visible to everything composed inside a
//! `with_local` call. They replace ambient globals: a storage backend, for
//! instance, is provided once at the root and read by any hook below it.
//!
//! ```rust
//! use tether_core::*;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Greeting(&'static str);
//!
//! assert_eq!(local::<Greeting>(), None);
//! with_local(Greeting("hi"), || {
//!     assert_eq!(local::<Greeting>(), Some(Greeting("hi")));
//! });
//! ```
//!
//! Inner frames shadow outer ones for the same type.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static LOCALS_STACK: RefCell<Vec<HashMap<TypeId, Box<dyn Any>>>> =
        const { RefCell::new(Vec::new()) };
}

fn with_locals_frame<R>(f: impl FnOnce() -> R) -> R {
    // Non-panicking frame guard (ensures pop on unwind)
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            LOCALS_STACK.with(|st| {
                st.borrow_mut().pop();
            });
        }
    }
    LOCALS_STACK.with(|st| st.borrow_mut().push(HashMap::new()));
    let _guard = Guard;
    f()
}

fn set_local_boxed(t: TypeId, v: Box<dyn Any>) {
    LOCALS_STACK.with(|st| {
        let mut st = st.borrow_mut();
        if let Some(top) = st.last_mut() {
            top.insert(t, v);
        } else {
            let mut m = HashMap::new();
            m.insert(t, v);
            st.push(m);
        }
    });
}

/// Provides `value` to everything run inside `f`.
pub fn with_local<T: Clone + 'static, R>(value: T, f: impl FnOnce() -> R) -> R {
    with_locals_frame(|| {
        set_local_boxed(TypeId::of::<T>(), Box::new(value));
        f()
    })
}

/// Innermost provided value of type `T`, if any.
pub fn local<T: Clone + 'static>() -> Option<T> {
    LOCALS_STACK.with(|st| {
        for frame in st.borrow().iter().rev() {
            if let Some(v) = frame.get(&TypeId::of::<T>())
                && let Some(t) = v.downcast_ref::<T>()
            {
                return Some(t.clone());
            }
        }
        None
    })
}
