//! Request correlation ids.
//!
//! [`RequestId`] gives every request an id. If the caller already sent one in
//! the configured header (default `X-Request-ID`) it is kept verbatim, so an
//! id survives hops between services; otherwise a fresh one is generated (a
//! v4 UUID unless configured otherwise). The id is stored in the request
//! [`Context`], readable with [`get`], and echoed on the response under the
//! same header.
//!
//! ```rust
//! use sheath::middleware::request_id::{self, RequestId};
//! use sheath::{chain, Request};
//!
//! async fn app(req: Request) -> String {
//!     format!("your id is {}", request_id::get(req.context()))
//! }
//!
//! # fn main() -> Result<(), sheath::Error> {
//! let request_id = RequestId::builder()
//!     .header("X-Correlation-ID")
//!     .generator(|| String::from("fixed"))
//!     .build()?;
//!
//! let handler = chain(app, &[&request_id]);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chain::Middleware;
use crate::context::Context;
use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::request::Request;

/// Header used when none is configured.
pub const DEFAULT_HEADER: &str = "X-Request-ID";

type Generator = Arc<dyn Fn() -> String + Send + Sync + 'static>;

/// Private context key for the id.
struct RequestIdKey;

/// Settings shared read-only by every request the middleware handles.
struct Config {
    generator: Generator,
    header: HeaderName,
}

/// Middleware that assigns or propagates a request id.
///
/// Cheap to clone; clones share one immutable configuration.
#[derive(Clone)]
pub struct RequestId {
    config: Arc<Config>,
}

impl RequestId {
    /// Default settings: `X-Request-ID`, v4 UUIDs.
    pub fn new() -> Self {
        Self {
            config: Arc::new(Config {
                generator: default_generator(),
                header: HeaderName::from_static("x-request-id"),
            }),
        }
    }

    pub fn builder() -> Builder {
        Builder {
            generator: default_generator(),
            header: Ok(HeaderName::from_static("x-request-id")),
        }
    }

    /// Header the id is read from and written to.
    pub fn header_name(&self) -> &HeaderName {
        &self.config.header
    }

    /// The inbound id verbatim if the header is non-empty, a generated id
    /// otherwise, paired with the value to echo.
    fn resolve(&self, req: &Request) -> (String, Option<HeaderValue>) {
        match req.headers().get(&self.config.header) {
            Some(value) if !value.is_empty() => {
                let id = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (id, Some(value.clone()))
            }
            _ => {
                let id = (self.config.generator)();
                debug!(header = %self.config.header, request_id = %id, "generated request id");
                let value = header_value(&id);
                (id, value)
            }
        }
    }
}

impl Default for RequestId {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestId").field("header", &self.config.header).finish_non_exhaustive()
    }
}

impl Middleware for RequestId {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let this = self.clone();
        BoxedHandler::new(move |req: Request| {
            // Settled before `next` runs, like any header set on the way in.
            let (id, value) = this.resolve(&req);

            let ctx = req.context().with_value::<RequestIdKey>(id);
            let fut = next.call(req.with_context(ctx));
            let header = this.config.header.clone();

            async move {
                let mut res = fut.await;
                // A downstream handler that set the header on purpose keeps it.
                if let Some(value) = value {
                    res.headers_mut().entry(header).or_insert(value);
                }
                res
            }
        })
    }
}

/// The id [`RequestId`] stored for this request, or `""` if there is none.
pub fn get(ctx: &Context) -> &str {
    ctx.get::<RequestIdKey, String>().map_or("", String::as_str)
}

/// Encodes a generated id, turning control characters into spaces so the
/// header is still sent.
fn header_value(id: &str) -> Option<HeaderValue> {
    let bytes: Vec<u8> = id
        .bytes()
        .map(|b| if (b < b' ' && b != b'\t') || b == 0x7f { b' ' } else { b })
        .collect();
    match HeaderValue::from_bytes(&bytes) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(request_id = %id, "request id is not a valid header value, not echoing it");
            None
        }
    }
}

fn default_generator() -> Generator {
    Arc::new(|| Uuid::new_v4().to_string())
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Builder for a configured [`RequestId`].
///
/// Calls apply in order and the last call for a field wins. An invalid header
/// name is reported by [`build`](Self::build), unless a later
/// [`header`](Self::header) call replaces it.
pub struct Builder {
    generator: Generator,
    header: Result<HeaderName, Error>,
}

impl Builder {
    /// Reads and writes the id under `name` instead of `X-Request-ID`.
    pub fn header(mut self, name: &str) -> Self {
        self.header = HeaderName::try_from(name).map_err(Error::from);
        self
    }

    /// Replaces the id generator.
    ///
    /// The generator is only called when the request carries no id. It should
    /// return unique, non-empty values. Control characters such as newlines
    /// are sent as spaces in the response header; the context keeps the id as
    /// generated.
    pub fn generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.generator = Arc::new(generator);
        self
    }

    pub fn build(self) -> Result<RequestId, Error> {
        Ok(RequestId {
            config: Arc::new(Config { generator: self.generator, header: self.header? }),
        })
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder").field("header", &self.header).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::{chain, Response};

    async fn empty_response(_req: Request) -> Response {
        Response::status(StatusCode::OK)
    }

    async fn echo_id(req: Request) -> String {
        get(req.context()).to_owned()
    }

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Bytes::new()).unwrap().into()
    }

    #[tokio::test]
    async fn generates_uuid_when_missing() {
        let handler = chain(empty_response, &[&RequestId::new()]);
        let res = handler.call(request(&[])).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        let id = res.header(DEFAULT_HEADER).unwrap();
        assert_eq!(Uuid::parse_str(id).unwrap().get_version_num(), 4);
    }

    #[tokio::test]
    async fn passes_inbound_id_through() {
        let handler = chain(empty_response, &[&RequestId::new()]);
        let res = handler.call(request(&[(DEFAULT_HEADER, "ABC")])).await;

        assert_eq!(res.header(DEFAULT_HEADER), Some("ABC"));
    }

    #[tokio::test]
    async fn empty_inbound_id_is_replaced() {
        let request_id = RequestId::builder().generator(|| "fresh".into()).build().unwrap();
        let handler = chain(empty_response, &[&request_id]);
        let res = handler.call(request(&[(DEFAULT_HEADER, "")])).await;

        assert_eq!(res.header(DEFAULT_HEADER), Some("fresh"));
    }

    #[tokio::test]
    async fn custom_header() {
        let request_id = RequestId::builder().header("X-Custom-ID").build().unwrap();
        let handler = chain(empty_response, &[&request_id]);
        let res = handler.call(request(&[])).await;

        assert!(!res.header("X-Custom-ID").unwrap_or_default().is_empty());
        assert!(res.header(DEFAULT_HEADER).is_none());
    }

    #[tokio::test]
    async fn custom_generator() {
        let request_id = RequestId::builder().generator(|| "custom".into()).build().unwrap();
        let handler = chain(empty_response, &[&request_id]);
        let res = handler.call(request(&[])).await;

        assert_eq!(res.header(DEFAULT_HEADER), Some("custom"));
    }

    #[tokio::test]
    async fn handler_sees_the_echoed_id() {
        let handler = chain(echo_id, &[&RequestId::new()]);
        let res = handler.call(request(&[])).await;

        let echoed = res.header(DEFAULT_HEADER).unwrap();
        assert!(!echoed.is_empty());
        assert_eq!(&res.body()[..], echoed.as_bytes());
    }

    #[tokio::test]
    async fn header_set_downstream_wins() {
        async fn sets_own_id(_req: Request) -> Response {
            Response::builder()
                .header(HeaderName::from_static("x-request-id"), HeaderValue::from_static("inner"))
                .no_body()
        }

        let handler = chain(sets_own_id, &[&RequestId::new()]);
        let res = handler.call(request(&[(DEFAULT_HEADER, "outer")])).await;

        assert_eq!(res.header(DEFAULT_HEADER), Some("inner"));
        assert_eq!(res.headers().get_all(DEFAULT_HEADER).iter().count(), 1);
    }

    #[tokio::test]
    async fn control_characters_are_echoed_as_spaces() {
        let request_id = RequestId::builder().generator(|| "bad\nid".into()).build().unwrap();
        let handler = chain(echo_id, &[&request_id]);
        let res = handler.call(request(&[])).await;

        assert_eq!(res.header(DEFAULT_HEADER), Some("bad id"));
        assert_eq!(&res.body()[..], b"bad\nid");
    }

    #[tokio::test]
    async fn non_ascii_inbound_id_is_adopted_verbatim() {
        let request_id = RequestId::builder().generator(|| "regenerated".into()).build().unwrap();
        let handler = chain(echo_id, &[&request_id]);
        let req: Request = http::Request::builder()
            .uri("/")
            .header(DEFAULT_HEADER, HeaderValue::from_bytes("café-1".as_bytes()).unwrap())
            .body(Bytes::new())
            .unwrap()
            .into();
        let res = handler.call(req).await;

        assert_eq!(&res.body()[..], "café-1".as_bytes());
        assert_eq!(res.headers()[DEFAULT_HEADER].as_bytes(), "café-1".as_bytes());
    }

    #[tokio::test]
    async fn ids_differ_between_requests() {
        let handler = chain(echo_id, &[&RequestId::new()]);
        let first = handler.call(request(&[])).await;
        let second = handler.call(request(&[])).await;

        assert_ne!(first.body(), second.body());
    }

    #[test]
    fn last_header_wins() {
        let request_id = RequestId::builder().header("X-A").header("X-B").build().unwrap();
        assert_eq!(request_id.header_name(), "x-b");
    }

    #[test]
    fn invalid_header_is_reported_by_build() {
        let err = RequestId::builder().header("bad header").build().unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderName(_)));
    }

    #[test]
    fn later_valid_header_replaces_invalid_one() {
        let request_id = RequestId::builder().header("bad header").header("X-Ok").build().unwrap();
        assert_eq!(request_id.header_name(), "x-ok");
    }

    #[test]
    fn background_context_has_no_id() {
        assert_eq!(get(&Context::background()), "");
    }

    #[test]
    fn mistyped_value_reads_as_empty() {
        let ctx = Context::background().with_value::<RequestIdKey>(7_u8);
        assert_eq!(get(&ctx), "");
    }
}
