//! Handler shape and type erasure.
//!
//! # One shape for everything
//!
//! Middleware and terminal handlers are the same thing: an async function
//! that borrows the request's [`Ctx`] mutably and returns `Result<(), Error>`.
//! `Ok(())` means "carry on", `Err` aborts the chain.
//!
//! Because the returned future borrows the context, its type depends on the
//! borrow's lifetime. Rust cannot name that in a plain generic `Fut`, so the
//! future is boxed and the bound is higher-ranked:
//!
//! ```text
//! for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>>
//! ```
//!
//! In practice that means wrapping the body in `Box::pin(async move { … })`:
//!
//! ```rust
//! use waypost::{BoxFuture, Ctx, Error, Router};
//!
//! fn hello(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
//!     Box::pin(async move { ctx.write_text("hello") })
//! }
//!
//! let mut app = Router::new();
//! app.get("/hello", hello)
//!     .get("/bye", |ctx| Box::pin(async move { ctx.write_text("bye") }));
//! ```
//!
//! The router stores every handler as an [`Arc`]'d trait object, so the only
//! per-request cost is one virtual call and one boxed future per link in the
//! chain.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::ctx::Ctx;
use crate::error::Error;

/// A heap-allocated, type-erased future borrowing for `'a`.
///
/// `Send` lets tokio move the dispatch future across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased handler or middleware, shared across concurrent requests.
pub(crate) type BoxedHandler =
    Arc<dyn for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static>;

pub(crate) fn boxed<H>(handler: H) -> BoxedHandler
where
    H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
{
    Arc::new(handler)
}
