//! Incoming HTTP request type.

use bytes::Bytes;
use http::header::AsHeaderName;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::context::Context;

/// An incoming HTTP request with its body fully read and a per-request
/// [`Context`] attached.
///
/// Build one from an [`http::Request<Bytes>`] with `From`:
///
/// ```rust
/// use bytes::Bytes;
/// use sheath::Request;
///
/// let req: Request = http::Request::builder()
///     .uri("/users/42")
///     .header("hx-request", "true")
///     .body(Bytes::new())
///     .unwrap()
///     .into();
///
/// assert_eq!(req.path(), "/users/42");
/// assert_eq!(req.header("HX-Request"), Some("true"));
/// ```
#[derive(Debug)]
pub struct Request {
    parts: Parts,
    body: Bytes,
    context: Context,
}

impl Request {
    pub(crate) fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self { parts, body, context: Context::background() }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup.
    ///
    /// Returns `None` when the header is absent or its value is not visible
    /// ASCII.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The context this request is currently bound to.
    pub fn context(&self) -> &Context { &self.context }

    /// Rebinds the request to `context`, typically one derived from
    /// [`context()`](Self::context) with an extra value.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}
