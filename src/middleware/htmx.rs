//! htmx request detection.
//!
//! htmx marks every request it sends with `HX-Request: true`. [`check_htmx`]
//! records whether that header is present with exactly that value, and
//! [`is_htmx`] reads the answer back so handlers can return a fragment instead
//! of a full page.

use crate::context::Context;
use crate::handler::BoxedHandler;
use crate::request::Request;

/// Header htmx sets on its requests.
pub const HEADER: &str = "HX-Request";

/// Private context key for the flag.
struct HtmxKey;

/// Middleware that stores whether the request came from htmx.
///
/// The comparison is exact: `"true"` sets the flag, while `"True"`, `" true"`,
/// `""` and a missing header do not.
pub fn check_htmx(next: BoxedHandler) -> BoxedHandler {
    BoxedHandler::new(move |req: Request| {
        let flag = req.header(HEADER) == Some("true");
        let ctx = req.context().with_value::<HtmxKey>(flag);
        next.call(req.with_context(ctx))
    })
}

/// Whether [`check_htmx`] saw an htmx request.
///
/// `false` when the middleware never ran for this context.
pub fn is_htmx(ctx: &Context) -> bool {
    ctx.get::<HtmxKey, bool>().copied().unwrap_or(false)
}
