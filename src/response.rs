//! Outgoing response sink and the JSON response envelope.
//!
//! Handlers never build a response value. They write into the
//! [`ResponseWriter`] their [`Ctx`](crate::Ctx) owns, and the router turns it
//! into an `http::Response` once the chain is done.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Ctx::content_type`](crate::Ctx::content_type).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str { self.as_str() }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// Buffered response sink for one request.
///
/// Follows the usual writer contract: the first status written is the one
/// sent, later attempts are ignored; writing body bytes before any status
/// implies `200 OK`. Headers stay mutable until the response is handed to
/// the transport.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self { Self::default() }

    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    /// The status already committed, if any.
    pub fn written_status(&self) -> Option<StatusCode> { self.status }

    /// Body bytes written so far.
    pub fn body(&self) -> &[u8] { &self.body }

    /// Commits the status line. Only the first call has an effect.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            Some(sent) => warn!(%sent, ignored = %status, "superfluous write_header call"),
            None => self.status = Some(status),
        }
    }

    /// Appends to the body, committing `200 OK` if no status was written yet.
    ///
    /// Bytes written under a status that forbids a body (1xx, 204, 304) are
    /// dropped.
    pub fn write(&mut self, bytes: &[u8]) {
        let status = *self.status.get_or_insert(StatusCode::OK);
        if !body_allowed(status) {
            if !bytes.is_empty() {
                warn!(%status, len = bytes.len(), "body not allowed for status, dropping write");
            }
            return;
        }
        self.body.extend_from_slice(bytes);
    }

    /// Plain-text error reply: `message` plus a newline, with sniffing disabled.
    ///
    /// Headers are frozen once a status is committed, so a late error only
    /// appends its text.
    pub(crate) fn write_error(&mut self, status: StatusCode, message: &str) {
        if self.status.is_none() {
            self.headers.remove(CONTENT_LENGTH);
            self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Text.as_str()));
            self.headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        }
        self.write_header(status);
        self.write(message.as_bytes());
        self.write(b"\n");
    }

    pub(crate) fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = self.headers;
        res
    }
}

fn body_allowed(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// A JSON object with string keys, for ad-hoc `data` payloads.
pub type Map = serde_json::Map<String, serde_json::Value>;

/// The conventional JSON reply shape:
///
/// ```json
/// { "success": true, "message": "optional", "data": { "optional": true } }
/// ```
///
/// `message` is omitted when empty and `data` when `None`.
///
/// ```rust
/// use waypost::{Envelope, Map};
///
/// let mut data = Map::new();
/// data.insert("foo".into(), "bar".into());
/// let body = serde_json::to_string(&Envelope::ok(data)).unwrap();
/// assert_eq!(body, r#"{"success":true,"data":{"foo":"bar"}}"#);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Envelope<T = serde_json::Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// `success: true` carrying `data`.
    pub fn ok(data: T) -> Self {
        Self { success: true, message: String::new(), data: Some(data) }
    }

    /// `success: false` with a message and no data.
    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None }
    }

    /// An envelope with only a success flag and a message.
    pub fn message(success: bool, message: impl Into<String>) -> Self {
        Self { success, message: message.into(), data: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}
