//! Minimal waypost example: a user group with JSON endpoints, request ids
//! and health checks.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/welcome
//!   curl -X POST http://localhost:3000/users/ \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X POST http://localhost:3000/users/ -d '{"name":""}'
//!   curl -X DELETE http://localhost:3000/admin/users/42 -H 'authorization: letmein'
//!   curl http://localhost:3000/healthz

use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use waypost::{
    BoxError, BoxFuture, Ctx, Envelope, Error, Map, Router, Rules, Server, Validate, health,
    middleware,
};

#[derive(Deserialize, Serialize)]
struct User {
    name: String,
}

impl Validate for User {
    fn validate(&self) -> Result<(), BoxError> {
        if self.name.is_empty() {
            return Err("name is required".into());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut app = Router::with_validator(Rules::new().check::<User>());
    app.get("/healthz", health::liveness)
        .get("/readyz", health::readiness)
        .use_middleware(middleware::request_id)
        .use_middleware(middleware::trace);

    let users = app.group("/users");
    users.get("/welcome", welcome).post("/", create_user);

    let admin = app.group("/admin");
    admin.use_middleware(require_token).delete("/users/{id}", delete_user);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/welcome
fn welcome(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move {
        let mut data = Map::new();
        data.insert("foo".into(), "bar".into());
        data.insert("baz".into(), 123.into());
        ctx.write_json(&Envelope::ok(data).with_message("Hi bro"))
    })
}

// POST /users/
//
// validate_body sets 400 on failure; send_error commits it and the router
// writes the error text as the body.
fn create_user(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move {
        let user: User = match ctx.validate_body() {
            Ok(user) => user,
            Err(err) => return ctx.send_error(err),
        };
        ctx.set_status(StatusCode::CREATED).write_json(&Envelope::ok(user))
    })
}

fn require_token(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move {
        if ctx.request_header("authorization") == Some("letmein") {
            return ctx.next();
        }
        ctx.set_status(StatusCode::UNAUTHORIZED).send_error(Error::msg("missing token"))
    })
}

// DELETE /admin/users/{id} → 204 No Content
fn delete_user(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move { ctx.send_status(StatusCode::NO_CONTENT) })
}
