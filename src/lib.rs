//! # waypost
//!
//! Express-style route declaration on top of hyper: route groups, ordered
//! middleware, a per-request context and JSON / plain-text reply helpers.
//! Nothing more.
//!
//! ## The pieces
//!
//! - [`Router`]: route table (radix tree via [`matchit`]), middleware chain,
//!   groups mounted under a prefix, and independent routers combined as
//!   fallbacks.
//! - [`Ctx`]: the request/response in progress: status, headers, locals,
//!   JSON decode + validate, text / JSON writers.
//! - [`Server`]: tokio accept loop with graceful shutdown.
//!
//! Middleware and handlers share one shape, an async function over
//! `&mut Ctx` returning `Result<(), Error>`. Returning an error stops the
//! chain; the router writes the error text at the status the context
//! carries, or 500.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use serde::{Deserialize, Serialize};
//! use waypost::{BoxFuture, Ctx, Envelope, Error, Router, Server, middleware};
//!
//! #[derive(Deserialize, Serialize)]
//! struct User {
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = Router::new();
//!     app.use_middleware(middleware::request_id);
//!
//!     let users = app.group("/users");
//!     users.get("/{id}", get_user).post("/", create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! fn get_user(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
//!     Box::pin(async move {
//!         let name = ctx.param("id").unwrap_or("unknown").to_owned();
//!         ctx.write_json(&Envelope::ok(User { name }))
//!     })
//! }
//!
//! fn create_user(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
//!     Box::pin(async move {
//!         let user: User = match ctx.validate_body() {
//!             Ok(user) => user,
//!             // status is already 400; the router writes the error text
//!             Err(err) => return ctx.send_error(err),
//!         };
//!         ctx.set_status(StatusCode::CREATED).write_json(&Envelope::ok(user))
//!     })
//! }
//! ```

mod ctx;
mod error;
mod request;
mod response;
mod router;
mod server;
mod validator;

pub mod handler;
pub mod health;
pub mod middleware;

pub use ctx::Ctx;
pub use error::{BoxError, Error};
pub use handler::BoxFuture;
pub use request::Request;
pub use response::{ContentType, Envelope, Map, ResponseWriter};
pub use router::Router;
pub use server::Server;
pub use validator::{Rules, Validate, Validator};
