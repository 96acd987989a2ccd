use tracing::debug;

use crate::ctx::Ctx;
use crate::error::Error;
use crate::handler::BoxFuture;

/// Emits one `debug!` event per request with its method and paths.
///
/// `path` is what the owning router sees (group prefix stripped), `uri` is
/// what the client asked for.
pub fn trace(ctx: &mut Ctx) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move {
        debug!(
            method = %ctx.method(),
            path = ctx.path(),
            uri = %ctx.request().uri(),
            "request"
        );
        ctx.next()
    })
}
