//! Built-in health-check handlers.
//!
//! | Probe | Suggested path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can it serve traffic? Failure → pulled from the load balancer. |
//!
//! ```rust
//! use waypost::{Router, health};
//!
//! let mut app = Router::new();
//! app.get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```
//!
//! Replace `readiness` with your own handler when readiness depends on
//! something (a database pool, a warm cache):
//!
//! ```rust
//! use http::StatusCode;
//! use waypost::{BoxFuture, Ctx, Error};
//!
//! fn readiness(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
//!     Box::pin(async move {
//!         if pool_is_up().await {
//!             ctx.write_text("ready")
//!         } else {
//!             ctx.send_status(StatusCode::SERVICE_UNAVAILABLE)
//!         }
//!     })
//! }
//!
//! async fn pool_is_up() -> bool { true }
//! ```
//!
//! Health routes go through the router's middleware like any other route;
//! register them on a router without authentication middleware.

use crate::ctx::Ctx;
use crate::error::Error;
use crate::handler::BoxFuture;

/// Liveness probe. Always `200 OK` with body `ok`.
pub fn liveness(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move { ctx.write_text("ok") })
}

/// Readiness probe (default implementation). `200 OK` with body `ready`.
pub fn readiness(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move { ctx.write_text("ready") })
}
