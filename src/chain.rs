//! Middleware composition.
//!
//! A [`Middleware`] turns one handler into another. [`chain`] stacks a list of
//! them around a terminal handler, onion style: the first middleware listed is
//! the outermost layer, so it sees the request first and the response last.
//!
//! ```text
//! chain(app, &[&a, &b, &c])  ==  a.wrap(b.wrap(c.wrap(app)))
//!
//! request  → a → b → c → app
//! response ← a ← b ← c ← app
//! ```

use std::fmt;
use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};

/// A handler → handler transformation.
///
/// Any `Fn(BoxedHandler) -> BoxedHandler` closure or function is a
/// middleware, so the simplest one is a plain `fn`:
///
/// ```rust
/// use sheath::{BoxedHandler, Request};
///
/// fn noop(next: BoxedHandler) -> BoxedHandler {
///     BoxedHandler::new(move |req: Request| next.call(req))
/// }
/// ```
///
/// Types that carry configuration, like
/// [`RequestId`](crate::middleware::request_id::RequestId), implement the
/// trait directly.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// Wraps `handler` with `middleware`, first element outermost.
///
/// With no middleware the handler comes back as is; with one it is exactly
/// `middleware[0].wrap(handler)`.
pub fn chain(handler: impl Handler, middleware: &[&dyn Middleware]) -> BoxedHandler {
    let handler = handler.into_boxed_handler();
    match middleware {
        [] => handler,
        [only] => only.wrap(handler),
        _ => middleware.iter().rev().fold(handler, |next, m| m.wrap(next)),
    }
}

/// An owned, reusable middleware stack.
///
/// ```rust
/// use sheath::middleware::{htmx, request_id::RequestId};
/// use sheath::{Chain, Request};
///
/// async fn app(_req: Request) -> &'static str { "ok" }
///
/// let stack = Chain::new().with(RequestId::new()).with(htmx::check_htmx);
/// let handler = stack.then(app);
/// ```
///
/// A `Chain` is itself a [`Middleware`], so stacks nest.
#[derive(Clone, Default)]
pub struct Chain {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `middleware` as the new innermost layer.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Wraps `handler` with every layer, in the order they were added.
    pub fn then(&self, handler: impl Handler) -> BoxedHandler {
        let layers: Vec<&dyn Middleware> = self.middleware.iter().map(|m| &**m).collect();
        chain(handler, &layers)
    }
}

impl Middleware for Chain {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self.then(next)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;
    use crate::{Request, Response};

    type Calls = Arc<Mutex<Vec<usize>>>;

    async fn endpoint(_req: Request) -> Response {
        Response::text("endpoint")
    }

    fn request() -> Request {
        http::Request::builder().uri("/").body(Bytes::new()).unwrap().into()
    }

    /// Middleware that records `n` before delegating.
    fn record(n: usize, calls: &Calls) -> impl Middleware {
        let calls = Arc::clone(calls);
        move |next: BoxedHandler| {
            let calls = Arc::clone(&calls);
            BoxedHandler::new(move |req: Request| {
                calls.lock().unwrap().push(n);
                next.call(req)
            })
        }
    }

    #[test]
    fn no_middleware_returns_handler_itself() {
        let handler = BoxedHandler::new(endpoint);
        let chained = chain(handler.clone(), &[]);
        assert!(chained.ptr_eq(&handler));
    }

    #[test]
    fn one_middleware_is_applied_directly() {
        let replacement = BoxedHandler::new(endpoint);
        let swap = {
            let replacement = replacement.clone();
            move |_next: BoxedHandler| replacement.clone()
        };

        let chained = chain(endpoint, &[&swap]);
        assert!(chained.ptr_eq(&replacement));
    }

    #[tokio::test]
    async fn first_middleware_runs_first() {
        let calls = Calls::default();
        let (one, two, three) = (record(1, &calls), record(2, &calls), record(3, &calls));

        let handler = chain(endpoint, &[&one, &two, &three]);
        let res = handler.call(request()).await;

        assert_eq!(*calls.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(&res.body()[..], b"endpoint");
    }

    #[tokio::test]
    async fn order_is_fixed_across_requests() {
        let calls = Calls::default();
        let (one, two) = (record(1, &calls), record(2, &calls));

        let handler = chain(endpoint, &[&one, &two]);
        handler.call(request()).await;
        handler.call(request()).await;

        assert_eq!(*calls.lock().unwrap(), vec![1, 2, 1, 2]);
    }

    #[tokio::test]
    async fn chain_value_matches_free_function() {
        let calls = Calls::default();
        let stack = Chain::new()
            .with(record(1, &calls))
            .with(record(2, &calls))
            .with(record(3, &calls));
        assert_eq!(stack.len(), 3);

        stack.then(endpoint).call(request()).await;
        assert_eq!(*calls.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn chains_nest() {
        let calls = Calls::default();
        let inner = Chain::new().with(record(2, &calls)).with(record(3, &calls));
        let outer = record(1, &calls);

        chain(endpoint, &[&outer, &inner]).call(request()).await;
        assert_eq!(*calls.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_chain_is_identity() {
        let handler = BoxedHandler::new(endpoint);
        assert!(Chain::new().is_empty());
        assert!(Chain::new().then(handler.clone()).ptr_eq(&handler));
    }
}
