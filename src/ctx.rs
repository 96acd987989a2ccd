//! Per-request context handed to every middleware and handler.
//!
//! A [`Ctx`] bundles the inbound [`Request`], the outbound
//! [`ResponseWriter`], the status the handler intends to send and the
//! router's validator. One is built per dispatch and dropped once the chain
//! has finished.
//!
//! Setting the status and writing it are separate steps: [`Ctx::set_status`]
//! only records the code, the `write_*` / `send_*` helpers commit it.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderValue, Method, StatusCode};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::Error;
use crate::request::Request;
use crate::response::{ContentType, ResponseWriter};
use crate::validator::Validator;

/// The request/response pair in progress.
pub struct Ctx {
    request: Request,
    response: ResponseWriter,
    status: Option<StatusCode>,
    validator: Option<Arc<dyn Validator>>,
}

impl Ctx {
    pub(crate) fn new(request: Request, validator: Option<Arc<dyn Validator>>) -> Self {
        Self {
            request,
            response: ResponseWriter::new(),
            status: None,
            validator,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn request(&self) -> &Request { &self.request }
    pub fn response(&self) -> &ResponseWriter { &self.response }
    pub fn response_mut(&mut self) -> &mut ResponseWriter { &mut self.response }
    pub fn method(&self) -> &Method { self.request.method() }
    pub fn path(&self) -> &str { self.request.path() }
    pub fn param(&self, key: &str) -> Option<&str> { self.request.param(key) }
    pub fn body(&self) -> &Bytes { self.request.body() }

    // ── Status ────────────────────────────────────────────────────────────────

    /// The status the next write will commit. `200 OK` until set.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Records the status to send. Nothing is written yet.
    ///
    /// Chainable: `ctx.set_status(StatusCode::CREATED).write_json(&user)`.
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    // ── Headers ───────────────────────────────────────────────────────────────

    /// Reads an **outbound** header previously set on this response.
    ///
    /// Use [`request_header`](Self::request_header) for what the client sent.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.response.headers().get(key).and_then(|v| v.to_str().ok())
    }

    /// [`get_header`](Self::get_header) with a fallback for unset headers.
    pub fn get_header_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_header(key).unwrap_or(default)
    }

    /// Reads an inbound request header.
    pub fn request_header(&self, key: &str) -> Option<&str> {
        self.request.header(key)
    }

    /// Sets an outbound header, replacing any previous value.
    ///
    /// Names or values that are not valid HTTP are dropped with a warning.
    pub fn set_header(&mut self, key: &str, value: &str) {
        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                warn!(header = key, "invalid header name, ignored");
                return;
            }
        };
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.response.headers_mut().insert(name, value);
            }
            Err(_) => warn!(header = key, "invalid header value, ignored"),
        }
    }

    pub fn content_type(&mut self, value: impl AsRef<str>) {
        self.set_header(CONTENT_TYPE.as_str(), value.as_ref());
    }

    // ── Locals ────────────────────────────────────────────────────────────────

    /// Binds `value` to `key` for the rest of this request and returns it.
    ///
    /// The request is not mutated: the context switches to a derived request
    /// carrying the new binding.
    pub fn set_local<K, V>(&mut self, key: K, value: V) -> Arc<V>
    where
        K: PartialEq + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let value = Arc::new(value);
        self.request = self.request.with_local(key, Arc::clone(&value));
        value
    }

    /// The newest value bound to `key`, if it is a `V`.
    pub fn get_local<K, V>(&self, key: &K) -> Option<&V>
    where
        K: PartialEq + 'static,
        V: 'static,
    {
        self.request.local(key)
    }

    // ── Bodies ────────────────────────────────────────────────────────────────

    /// Decodes the first JSON value of the request body.
    ///
    /// On failure the status becomes `400 Bad Request` and the error is
    /// returned to the caller; nothing is written.
    ///
    /// - [`Error::EmptyBody`]: blank body on POST, PUT, PATCH or DELETE.
    /// - [`Error::InvalidBody`]: anything else, including a blank body on
    ///   GET, HEAD or OPTIONS.
    pub fn decode_body<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let body = self.request.body().clone();
        let mut de = serde_json::Deserializer::from_slice(&body);
        match T::deserialize(&mut de) {
            Ok(value) => Ok(value),
            Err(source) => {
                self.set_status(StatusCode::BAD_REQUEST);
                if requires_body(self.request.method()) && body.iter().all(is_json_whitespace) {
                    Err(Error::EmptyBody)
                } else {
                    Err(Error::InvalidBody(source))
                }
            }
        }
    }

    /// [`decode_body`](Self::decode_body), then the router's validator.
    ///
    /// A rejection sets `400 Bad Request` and surfaces the validator's error
    /// as [`Error::Validation`]. Without a validator only decoding is checked.
    pub fn validate_body<T: DeserializeOwned + 'static>(&mut self) -> Result<T, Error> {
        let value = self.decode_body::<T>()?;
        let verdict = match &self.validator {
            Some(validator) => validator.validate(&value),
            None => Ok(()),
        };
        if let Err(err) = verdict {
            self.set_status(StatusCode::BAD_REQUEST);
            return Err(Error::Validation(err));
        }
        Ok(value)
    }

    /// Writes `data` as two-space indented JSON followed by a newline.
    ///
    /// Serialisation happens before any byte is written, so a failure leaves
    /// the body untouched.
    pub fn encode_body<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<(), Error> {
        let mut buf = serde_json::to_vec_pretty(data).map_err(Error::Encode)?;
        buf.push(b'\n');
        self.response.write(&buf);
        Ok(())
    }

    // ── Writers ───────────────────────────────────────────────────────────────

    /// Plain-text reply at the recorded status. A `204 No Content` status
    /// suppresses the body.
    pub fn write_text(&mut self, message: impl AsRef<str>) -> Result<(), Error> {
        let status = self.status();
        self.content_type(ContentType::Text);
        self.response.write_header(status);
        if status != StatusCode::NO_CONTENT {
            self.response.write(message.as_ref().as_bytes());
        }
        Ok(())
    }

    /// JSON reply at the recorded status.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<(), Error> {
        let status = self.status();
        self.content_type(ContentType::Json);
        self.response.write_header(status);
        self.encode_body(data)
    }

    /// Lets the chain continue. Always `Ok(())`; the router drives the chain.
    pub fn next(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Sets `status` and replies with its reason phrase as plain text.
    pub fn send_status(&mut self, status: StatusCode) -> Result<(), Error> {
        self.set_status(status);
        self.write_text(status.canonical_reason().unwrap_or(""))
    }

    /// Commits the recorded status and hands `err` back unchanged.
    ///
    /// The router writes the error text once it comes out of the chain:
    ///
    /// ```rust
    /// # use waypost::{Ctx, Error};
    /// # use http::StatusCode;
    /// fn deny(ctx: &mut Ctx) -> Result<(), Error> {
    ///     ctx.set_status(StatusCode::FORBIDDEN).send_error(Error::msg("forbidden"))
    /// }
    /// ```
    pub fn send_error(&mut self, err: impl Into<Error>) -> Result<(), Error> {
        self.response.write_header(self.status());
        Err(err.into())
    }

    // ── Chain plumbing ────────────────────────────────────────────────────────

    /// Writes `err` as a plain-text reply at the recorded status, or 500 if
    /// none was ever set.
    pub(crate) fn fail(&mut self, err: &Error) {
        let status = self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.response.write_error(status, &err.to_string());
    }

    pub(crate) fn into_response(self) -> http::Response<Full<Bytes>> {
        self.response.into_response()
    }
}

// JSON whitespace only; form feed and friends are syntax errors.
fn is_json_whitespace(b: &u8) -> bool {
    matches!(*b, b' ' | b'\t' | b'\n' | b'\r')
}

fn requires_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use http::header::{CONTENT_TYPE, LOCATION};
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::error::BoxError;
    use crate::response::Envelope;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    fn ctx(method: Method, body: &'static str) -> Ctx {
        ctx_with(method, body, None)
    }

    fn ctx_with(method: Method, body: &'static str, validator: Option<Arc<dyn Validator>>) -> Ctx {
        let req = http::Request::builder()
            .method(method)
            .uri("/users")
            .header("x-client", "cli")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        Ctx::new(Request::from_http(req), validator)
    }

    fn name_required() -> Arc<dyn Validator> {
        Arc::new(|value: &dyn Any| -> Result<(), BoxError> {
            match value.downcast_ref::<User>() {
                Some(user) if user.name.is_empty() => Err("name is required".into()),
                _ => Ok(()),
            }
        })
    }

    #[test]
    fn status_defaults_to_ok_and_chains() {
        let mut c = ctx(Method::GET, "");
        assert_eq!(c.status(), StatusCode::OK);
        c.set_status(StatusCode::CREATED).set_header("location", "/users/1");
        assert_eq!(c.status(), StatusCode::CREATED);
        assert_eq!(c.response().headers()[LOCATION], "/users/1");
        assert!(c.response().written_status().is_none());
    }

    #[test]
    fn get_header_reads_outbound_headers() {
        let mut c = ctx(Method::GET, "");
        assert_eq!(c.get_header("x-client"), None);
        assert_eq!(c.request_header("x-client"), Some("cli"));
        assert_eq!(c.get_header_or("x-trace", "none"), "none");

        c.set_header("x-trace", "t-1");
        assert_eq!(c.get_header("X-Trace"), Some("t-1"));
        c.set_header("x-trace", "t-2");
        assert_eq!(c.get_header_or("x-trace", "none"), "t-2");
    }

    #[test]
    fn invalid_headers_are_dropped() {
        let mut c = ctx(Method::GET, "");
        c.set_header("bad header", "v");
        c.set_header("x-ok", "line\nbreak");
        assert!(c.response().headers().is_empty());
    }

    #[test]
    fn locals_round_trip() {
        let mut c = ctx(Method::GET, "");
        let stored = c.set_local("user", User { name: "ann".into() });
        assert_eq!(stored.name, "ann");
        assert_eq!(c.get_local::<_, User>(&"user").map(|u| u.name.as_str()), Some("ann"));
        assert!(c.get_local::<_, User>(&"other").is_none());
    }

    #[test]
    fn decode_reads_the_first_value() {
        let mut c = ctx(Method::POST, r#"{"name":"ann"} trailing"#);
        assert_eq!(c.decode_body::<User>().unwrap(), User { name: "ann".into() });
        assert_eq!(c.status(), StatusCode::OK);
    }

    #[test]
    fn empty_body_depends_on_method() {
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let mut c = ctx(method.clone(), "");
            assert!(matches!(c.decode_body::<User>(), Err(Error::EmptyBody)), "{method}");
            assert_eq!(c.status(), StatusCode::BAD_REQUEST);
        }
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let mut c = ctx(method.clone(), "");
            assert!(matches!(c.decode_body::<User>(), Err(Error::InvalidBody(_))), "{method}");
            assert_eq!(c.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn blank_body_counts_as_empty() {
        let mut c = ctx(Method::POST, " \n\t");
        assert!(matches!(c.decode_body::<User>(), Err(Error::EmptyBody)));
    }

    #[test]
    fn form_feed_is_not_json_whitespace() {
        let mut c = ctx(Method::POST, "\x0c");
        assert!(matches!(c.decode_body::<User>(), Err(Error::InvalidBody(_))));
        assert_eq!(c.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn malformed_and_mismatched_bodies_are_invalid() {
        let mut c = ctx(Method::POST, r#"{"name":"#);
        assert!(matches!(c.decode_body::<User>(), Err(Error::InvalidBody(_))));

        let mut c = ctx(Method::POST, r#"{"name":42}"#);
        let err = c.decode_body::<User>().unwrap_err();
        assert_eq!(err.to_string(), "invalid body");
        assert_eq!(c.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validate_without_validator_only_decodes() {
        let mut c = ctx(Method::POST, r#"{"name":""}"#);
        assert_eq!(c.validate_body::<User>().unwrap().name, "");
        assert_eq!(c.status(), StatusCode::OK);
    }

    #[test]
    fn validate_propagates_decode_errors() {
        let mut c = ctx_with(Method::POST, "", Some(name_required()));
        assert!(matches!(c.validate_body::<User>(), Err(Error::EmptyBody)));
        assert_eq!(c.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_failure_sets_bad_request() {
        let mut c = ctx_with(Method::POST, r#"{"name":""}"#, Some(name_required()));
        let err = c.validate_body::<User>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.to_string(), "name is required");
        assert_eq!(c.status(), StatusCode::BAD_REQUEST);

        let mut c = ctx_with(Method::POST, r#"{"name":"ann"}"#, Some(name_required()));
        assert!(c.validate_body::<User>().is_ok());
    }

    #[test]
    fn write_text_sets_type_and_status() {
        let mut c = ctx(Method::GET, "");
        c.set_status(StatusCode::ACCEPTED).write_text("queued").unwrap();

        let res = c.into_response();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert_eq!(res.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn no_content_suppresses_the_body() {
        let mut c = ctx(Method::DELETE, "");
        c.set_status(StatusCode::NO_CONTENT).write_text("gone").unwrap();
        assert_eq!(c.response().written_status(), Some(StatusCode::NO_CONTENT));
        assert!(c.response().body().is_empty());
    }

    #[test]
    fn write_json_is_indented() {
        let mut c = ctx(Method::GET, "");
        c.write_json(&Envelope::ok(json!({ "foo": "bar" }))).unwrap();

        assert_eq!(c.get_header("content-type"), Some("application/json"));
        let body = std::str::from_utf8(c.response().body()).unwrap();
        assert_eq!(body, "{\n  \"success\": true,\n  \"data\": {\n    \"foo\": \"bar\"\n  }\n}\n");
    }

    #[test]
    fn encode_failures_are_returned() {
        use std::collections::HashMap;

        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);
        let mut c = ctx(Method::GET, "");
        assert!(matches!(c.encode_body(&bad), Err(Error::Encode(_))));
        assert!(c.response().body().is_empty());
    }

    #[test]
    fn send_status_writes_reason_phrase() {
        let mut c = ctx(Method::GET, "");
        c.send_status(StatusCode::NOT_FOUND).unwrap();
        assert_eq!(c.response().written_status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(c.response().body(), b"Not Found");
    }

    #[test]
    fn send_error_commits_status_and_returns_the_error() {
        let mut c = ctx(Method::GET, "");
        let err = c.set_status(StatusCode::UNAUTHORIZED).send_error(Error::msg("who are you")).unwrap_err();
        assert_eq!(err.to_string(), "who are you");
        assert_eq!(c.response().written_status(), Some(StatusCode::UNAUTHORIZED));
        assert!(c.response().body().is_empty());
    }

    #[test]
    fn next_always_continues() {
        assert!(ctx(Method::GET, "").next().is_ok());
    }

    #[test]
    fn fail_defaults_to_internal_server_error() {
        let mut c = ctx(Method::GET, "");
        c.fail(&Error::msg("boom"));
        assert_eq!(c.response().written_status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(c.response().body(), b"boom\n");

        let mut c = ctx(Method::GET, "");
        c.set_status(StatusCode::CONFLICT);
        c.fail(&Error::msg("taken"));
        assert_eq!(c.response().written_status(), Some(StatusCode::CONFLICT));
    }
}
