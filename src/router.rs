//! Route table, middleware chain and group composition.
//!
//! One radix tree per HTTP method for routes registered directly on a
//! router. Groups are child routers mounted under a prefix; combined routers
//! are whole independent routers tried as fallbacks. Build everything once at
//! startup, then hand the router to [`Server::serve`](crate::Server::serve)
//! or call [`Router::dispatch`] yourself.
//!
//! # Resolution order
//!
//! For a request `(method, path)` a router tries, in order:
//!
//! 1. its own table (`HEAD` falls back to the `GET` route),
//! 2. the group with the longest prefix such that `path` starts with
//!    `prefix + "/"`; that group answers with the prefix stripped, and its
//!    answer is final,
//! 3. combined routers, first registered first; a router only claims paths
//!    its own table resolves,
//! 4. `405 Method Not Allowed` if the path exists under other methods,
//! 5. `404 Not Found`.
//!
//! # Middleware
//!
//! Middleware runs in registration order before the matched handler. The
//! first one to return `Err` ends the request: its error text is written at
//! the status the context carries (500 if none was set) and nothing after it
//! runs. A group starts with a copy of its parent's middleware taken when
//! the group is created.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::ALLOW;
use http::{HeaderValue, Method, StatusCode};
use http_body_util::Full;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::ctx::Ctx;
use crate::error::Error;
use crate::handler::{self, BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::validator::Validator;

/// The application router.
///
/// ```rust
/// use waypost::Router;
///
/// let mut app = Router::new();
/// app.use_middleware(waypost::middleware::trace);
///
/// let users = app.group("/users");
/// users.get("/welcome", |ctx| Box::pin(async move { ctx.write_text("hi") }));
/// // reachable at GET /users/welcome
/// ```
pub struct Router {
    validator: Option<Arc<dyn Validator>>,
    middleware: Vec<BoxedHandler>,
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    groups: Vec<Mount>,
    fallbacks: Vec<Router>,
}

struct Mount {
    prefix: String,
    router: Router,
}

enum Resolution<'r, 'p> {
    Found(Found<'r, 'p>),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

struct Found<'r, 'p> {
    owner: &'r Router,
    handler: &'r BoxedHandler,
    params: HashMap<String, String>,
    path: &'p str,
}

impl Router {
    pub fn new() -> Self {
        Self {
            validator: None,
            middleware: Vec::new(),
            routes: HashMap::new(),
            groups: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    /// A router whose contexts validate bodies with `validator`.
    /// Groups created from it share the same validator.
    pub fn with_validator(validator: impl Validator) -> Self {
        Self { validator: Some(Arc::new(validator)), ..Self::new() }
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Registers a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax and are read with
    /// [`Ctx::param`]. The path syntax is `matchit`'s.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or already registered for `method`.
    pub fn on<H>(&mut self, method: Method, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler::boxed(handler))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.on(Method::GET, path, handler)
    }

    pub fn head<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.on(Method::HEAD, path, handler)
    }

    pub fn options<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.on(Method::OPTIONS, path, handler)
    }

    pub fn post<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.on(Method::POST, path, handler)
    }

    pub fn put<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.on(Method::PUT, path, handler)
    }

    pub fn patch<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.on(Method::PATCH, path, handler)
    }

    pub fn delete<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.on(Method::DELETE, path, handler)
    }

    /// Appends a middleware to this router's chain.
    ///
    /// Affects every route of this router, including those registered
    /// earlier, but not groups that already exist.
    pub fn use_middleware<H>(&mut self, middleware: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Ctx) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.middleware.push(handler::boxed(middleware));
        self
    }

    /// Creates a child router mounted at `prefix`.
    ///
    /// The child shares this router's validator and starts with a copy of
    /// its current middleware. It sees request paths with `prefix` removed:
    /// a route `/welcome` on `group("/users")` answers `/users/welcome`.
    /// A trailing `/` on `prefix` is ignored.
    ///
    /// # Panics
    ///
    /// Panics if a group is already mounted at `prefix`.
    pub fn group(&mut self, prefix: &str) -> &mut Router {
        let prefix = prefix.trim_end_matches('/').to_owned();
        if self.groups.iter().any(|m| m.prefix == prefix) {
            panic!("duplicate group prefix `{prefix}`");
        }

        let router = Router {
            validator: self.validator.clone(),
            middleware: self.middleware.clone(),
            ..Router::new()
        };
        let index = self.groups.len();
        self.groups.push(Mount { prefix, router });
        &mut self.groups[index].router
    }

    /// Mounts independent routers as fallbacks, in order.
    ///
    /// Each keeps its own middleware and validator. A request that nothing
    /// on `self` claims goes to the first combined router able to resolve it.
    pub fn combine(&mut self, routers: impl IntoIterator<Item = Router>) -> &mut Self {
        self.fallbacks.extend(routers);
        self
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Routes one request through the matched router's middleware and
    /// handler and returns the response it wrote.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let response = match self.resolve(&method, &path) {
            Resolution::Found(found) => {
                let request = Request::from_http(req).routed(found.path, found.params);
                let mut ctx = Ctx::new(request, found.owner.validator.clone());
                found.owner.run(&mut ctx, found.handler).await;
                ctx.into_response()
            }
            Resolution::MethodNotAllowed(allowed) => method_not_allowed(&allowed),
            Resolution::NotFound => not_found(),
        };

        debug!(%method, %path, status = %response.status(), "dispatched");
        response
    }

    async fn run(&self, ctx: &mut Ctx, handler: &BoxedHandler) {
        for middleware in &self.middleware {
            if let Err(err) = middleware(&mut *ctx).await {
                debug!(error = %err, "middleware aborted the chain");
                ctx.fail(&err);
                return;
            }
        }

        if let Err(err) = handler(&mut *ctx).await {
            debug!(error = %err, "handler failed");
            ctx.fail(&err);
        }
    }

    fn resolve<'r, 'p>(&'r self, method: &Method, path: &'p str) -> Resolution<'r, 'p> {
        if let Some((handler, params)) = self.route(method, path) {
            return Resolution::Found(Found { owner: self, handler, params, path });
        }

        if let Some(mount) = self.mount_for(path) {
            return mount.router.resolve(method, &path[mount.prefix.len()..]);
        }

        let mut fallback_allowed = None;
        for fallback in &self.fallbacks {
            match fallback.resolve(method, path) {
                Resolution::Found(found) => return Resolution::Found(found),
                Resolution::MethodNotAllowed(allowed) => {
                    fallback_allowed.get_or_insert(allowed);
                }
                Resolution::NotFound => {}
            }
        }

        let allowed = self.allowed_methods(path);
        if !allowed.is_empty() {
            return Resolution::MethodNotAllowed(allowed);
        }
        fallback_allowed.map_or(Resolution::NotFound, Resolution::MethodNotAllowed)
    }

    fn route(&self, method: &Method, path: &str) -> Option<(&BoxedHandler, HashMap<String, String>)> {
        let hit = self.lookup(method, path);
        if hit.is_none() && *method == Method::HEAD {
            return self.lookup(&Method::GET, path);
        }
        hit
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(&BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value, params))
    }

    fn mount_for(&self, path: &str) -> Option<&Mount> {
        self.groups.iter()
            .filter(|m| {
                path.strip_prefix(m.prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|m| m.prefix.len())
    }

    fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| method.clone())
            .collect();
        if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
            allowed.push(Method::HEAD);
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn not_found() -> http::Response<Full<Bytes>> {
    let mut w = ResponseWriter::new();
    w.write_error(StatusCode::NOT_FOUND, "404 page not found");
    w.into_response()
}

fn method_not_allowed(allowed: &[Method]) -> http::Response<Full<Bytes>> {
    let list = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    let mut w = ResponseWriter::new();
    if let Ok(value) = HeaderValue::from_str(&list) {
        w.headers_mut().insert(ALLOW, value);
    }
    w.write_error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    w.into_response()
}
