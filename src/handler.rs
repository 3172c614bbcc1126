//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! Middleware wraps handlers of *different* concrete types around each other,
//! so every handler is erased into one shared shape, [`BoxedHandler`]:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ hello.into_boxed_handler()
//! BoxedHandler(Arc::new(FnHandler(hello)))         ← heap-allocated wrapper
//!        ↓ middleware.wrap(boxed)                  ← BoxedHandler → BoxedHandler
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })  ← BoxFuture
//! ```
//!
//! The runtime cost per layer is **one virtual call** plus whatever the
//! middleware itself does.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across threads safely.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface behind [`BoxedHandler`].
trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

// ── BoxedHandler ─────────────────────────────────────────────────────────────

/// A type-erased handler shared across concurrent requests.
///
/// This is what middleware receives as `next` and what it returns. Cloning
/// is one atomic increment.
#[derive(Clone)]
pub struct BoxedHandler(Arc<dyn ErasedHandler + Send + Sync + 'static>);

impl BoxedHandler {
    /// Erases any [`Handler`].
    pub fn new(handler: impl Handler) -> Self {
        handler.into_boxed_handler()
    }

    /// Runs the handler for one request.
    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }

    /// `true` when both values point at the same underlying handler.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoxedHandler").field(&Arc::as_ptr(&self.0)).finish()
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid request handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature
///
/// ```text
/// Fn(Request) -> impl Future<Output = impl IntoResponse>
/// ```
///
/// and by [`BoxedHandler`] itself, which erases to itself so that a handler
/// passed through [`chain`](crate::chain) untouched keeps its identity.
///
/// The trait is **sealed** (via the private `Sealed` supertrait).
pub trait Handler: private::Sealed + Send + Sync + 'static {
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        BoxedHandler(Arc::new(FnHandler(self)))
    }
}

impl private::Sealed for BoxedHandler {}

impl Handler for BoxedHandler {
    fn into_boxed_handler(self) -> BoxedHandler {
        self
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype that bridges a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    async fn hello(_req: Request) -> &'static str {
        "hello"
    }

    fn request() -> Request {
        http::Request::builder().uri("/").body(Bytes::new()).unwrap().into()
    }

    #[tokio::test]
    async fn async_fn_is_a_handler() {
        let res = BoxedHandler::new(hello).call(request()).await;
        assert_eq!(&res.body()[..], b"hello");
    }

    #[test]
    fn boxed_handler_erases_to_itself() {
        let boxed = BoxedHandler::new(hello);
        let again = BoxedHandler::new(boxed.clone());
        assert!(boxed.ptr_eq(&again));
        assert!(!boxed.ptr_eq(&BoxedHandler::new(hello)));
    }
}
