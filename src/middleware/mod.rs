//! Built-in middleware.
//!
//! Middleware has the same shape as a handler (see [`handler`](crate::handler)):
//! it borrows the [`Ctx`](crate::Ctx), does its work and returns
//! [`Ctx::next`](crate::Ctx::next) to let the chain continue, or an error to
//! stop it.
//!
//! ```rust
//! use waypost::{Router, middleware};
//!
//! let mut app = Router::new();
//! app.use_middleware(middleware::request_id)
//!     .use_middleware(middleware::trace);
//! ```

mod request_id;
mod trace;

pub use request_id::{RequestId, X_REQUEST_ID, request_id};
pub use trace::trace;
