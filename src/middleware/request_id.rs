use uuid::Uuid;

use crate::ctx::Ctx;
use crate::error::Error;
use crate::handler::BoxFuture;

/// Header carrying the request id in both directions.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Locals key under which [`request_id`] stores the id as a `String`.
///
/// ```rust
/// # use waypost::{Ctx, middleware::RequestId};
/// fn id(ctx: &Ctx) -> Option<&str> {
///     ctx.get_local::<_, String>(&RequestId).map(String::as_str)
/// }
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestId;

/// Tags every request with an id.
///
/// Reuses a non-empty inbound `x-request-id` (set by the proxy in front of
/// the service) or generates a UUID v4. The id is echoed on the response and
/// stored as a local under [`RequestId`].
pub fn request_id(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move {
        let id = match ctx.request_header(X_REQUEST_ID) {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => Uuid::new_v4().to_string(),
        };
        ctx.set_header(X_REQUEST_ID, &id);
        ctx.set_local(RequestId, id);
        ctx.next()
    })
}
