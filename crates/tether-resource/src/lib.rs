//! # Requests and error boundaries
//!
//! A tracked request moves through `Idle -> Pending -> Resolved | Rejected`.
//! [`remember_request`] starts one whenever the request key changes and
//! hands the caller a [`Ticket`]; whoever completes the work settles the
//! ticket. Tickets for superseded keys are ignored, so a slow response can
//! never overwrite a newer one.
//!
//! Views that find their request rejected return `Err`, and an enclosing
//! [`ErrorBoundary`] renders a fallback with a reset action instead.
//!
//! ```rust
//! use tether_core::Session;
//! use tether_resource::{Status, block_on_request, remember_request};
//!
//! let mut session = Session::new();
//! let state = session.compose(|| {
//!     remember_request::<u32, String>("answer", |ticket| {
//!         block_on_request(ticket, async { Ok(42) });
//!     })
//! });
//! assert_eq!(state.status(), Status::Resolved(42));
//! ```

mod boundary;
mod request;

pub use boundary::{ErrorBoundary, ResetHandle, remember_error_boundary};
pub use request::{
    RequestState, Status, StatusTag, Ticket, block_on_request, remember_request,
};
