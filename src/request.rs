//! Incoming HTTP request type.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};

/// An incoming HTTP request with its body fully buffered.
///
/// Cloning is cheap: the head, path, parameters and locals are shared
/// behind `Arc`s and the body is a ref-counted [`Bytes`].
///
/// A `Request` is never mutated after the router hands it to a [`Ctx`](crate::Ctx).
/// Attaching a local value derives a new request with one extra overlay node
/// ([`Request::with_local`]); the context swaps its reference to the new one.
#[derive(Clone)]
pub struct Request {
    head: Arc<Head>,
    path: Arc<str>,
    params: Arc<HashMap<String, String>>,
    body: Bytes,
    locals: Option<Arc<Local>>,
}

struct Head {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
}

/// One binding in the locals overlay. Lookups walk from the newest node to
/// the oldest, so a later binding of an equal key shadows an earlier one.
struct Local {
    key: Box<dyn Any + Send + Sync>,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Local>>,
}

impl Request {
    pub(crate) fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let path: Arc<str> = Arc::from(parts.uri.path());
        Self {
            head: Arc::new(Head {
                method: parts.method,
                uri: parts.uri,
                version: parts.version,
                headers: parts.headers,
            }),
            path,
            params: Arc::default(),
            body,
            locals: None,
        }
    }

    /// Rebinds the request to the path a mounted router sees and the
    /// parameters its pattern matched.
    pub(crate) fn routed(mut self, path: &str, params: HashMap<String, String>) -> Self {
        if &*self.path != path {
            self.path = Arc::from(path);
        }
        self.params = Arc::new(params);
        self
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn version(&self) -> Version { self.head.version }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// The path as seen by the router that owns the matched route.
    ///
    /// Inside a group mounted at `/users`, a request for `/users/welcome`
    /// reports `/welcome`. The original is still available through [`uri`](Self::uri).
    pub fn path(&self) -> &str { &self.path }

    /// Case-insensitive inbound header lookup. Non-UTF-8 values yield `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Derives a new request carrying `value` under `key`.
    ///
    /// `self` is left untouched, so a clone held elsewhere never observes
    /// the binding.
    pub fn with_local<K, V>(&self, key: K, value: Arc<V>) -> Self
    where
        K: PartialEq + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let node = Local {
            key: Box::new(key),
            value,
            parent: self.locals.clone(),
        };
        Self { locals: Some(Arc::new(node)), ..self.clone() }
    }

    /// Reads the newest value bound to `key`.
    ///
    /// Keys match on both type and equality: `"id"` (a `&str`) and
    /// `String::from("id")` are different keys. Returns `None` when the key
    /// is unbound or its newest value is not a `V`.
    pub fn local<K, V>(&self, key: &K) -> Option<&V>
    where
        K: PartialEq + 'static,
        V: 'static,
    {
        let mut node = self.locals.as_deref();
        while let Some(local) = node {
            if local.key.downcast_ref::<K>().is_some_and(|k| k == key) {
                return local.value.downcast_ref::<V>();
            }
            node = local.parent.as_deref();
        }
        None
    }
}
