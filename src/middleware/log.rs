//! Per-request structured logging.
//!
//! [`new_handler`] opens a `tracing` span for each request and attaches a
//! [`LogContext`] to the request context. Middleware further down can add
//! string fields to it; every field is recorded on the span, so all events
//! logged while the request is being handled carry it:
//!
//! ```text
//! INFO request{method=GET path=/ fields=request_id=5f0c… fields=user=alice}: app: loading user
//! ```
//!
//! [`log_request_id`] is the field source shipped here: it copies the id set
//! by [`RequestId`](super::request_id::RequestId) into the log context. It
//! must run after both [`new_handler`] and `RequestId`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{self, Empty};
use tracing::{Instrument, Span, info_span};

use super::request_id;
use crate::chain::Middleware;
use crate::context::Context;
use crate::handler::BoxedHandler;
use crate::request::Request;

/// Private context key for the log context.
struct LogKey;

// ── LogContext ────────────────────────────────────────────────────────────────

/// Structured fields bound to one request's span.
///
/// Clones share the same fields: an update made through one clone is seen by
/// all of them and by the span.
#[derive(Clone)]
pub struct LogContext {
    inner: Arc<Inner>,
}

struct Inner {
    span: Span,
    fields: Mutex<Vec<(String, String)>>,
}

impl LogContext {
    /// A log context recording into `span`.
    ///
    /// The span should declare an empty `fields` field; spans without one
    /// still get the fields stored here, they just do not show them.
    pub fn new(span: Span) -> Self {
        Self { inner: Arc::new(Inner { span, fields: Mutex::new(Vec::new()) }) }
    }

    pub fn span(&self) -> &Span {
        &self.inner.span
    }

    /// Sets the string field `key`. An existing field with that key is
    /// replaced in place; other fields are untouched.
    ///
    /// Only the pair being set is recorded on the span. Subscribers that
    /// append span recordings, like `tracing_subscriber::fmt`, therefore show
    /// every field once; a replaced value shows next to its predecessor.
    pub fn str(&self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        let pair = format!("{key}={value}");
        {
            let mut fields = self.lock();
            match fields.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => fields.push((key, value)),
            }
        }
        self.inner.span.record("fields", field::display(pair));
    }

    /// Current value of field `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    /// Snapshot of every field in insertion order.
    pub fn fields(&self) -> Vec<(String, String)> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, String)>> {
        // A panic while holding the lock cannot leave the list half-written.
        self.inner.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.lock()))
    }
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext").field("fields", &*self.lock()).finish()
    }
}

fn render(fields: &[(String, String)]) -> String {
    fields.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(" ")
}

/// The log context [`new_handler`] attached to this request, if any.
pub fn from_context(ctx: &Context) -> Option<LogContext> {
    ctx.get::<LogKey, LogContext>().cloned()
}

// ── RequestLogger ─────────────────────────────────────────────────────────────

/// Middleware that runs each request inside its own span with a fresh
/// [`LogContext`]. See [`new_handler`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLogger;

/// Per-request span and log context.
pub fn new_handler() -> RequestLogger {
    RequestLogger
}

impl Middleware for RequestLogger {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxedHandler::new(move |req: Request| {
            let span = info_span!(
                "request",
                method = %req.method(),
                path = %req.path(),
                fields = Empty,
            );
            let log = LogContext::new(span.clone());
            let ctx = req.context().with_value::<LogKey>(log);
            next.call(req.with_context(ctx)).instrument(span)
        })
    }
}

// ── LogRequestId ──────────────────────────────────────────────────────────────

/// Middleware that copies the request id into the log context. See
/// [`log_request_id`].
#[derive(Clone, Debug)]
pub struct LogRequestId {
    field: Arc<str>,
}

/// Adds the request id to the log context as field `field`.
///
/// Does nothing when the request has no id or no log context.
pub fn log_request_id(field: impl Into<String>) -> LogRequestId {
    LogRequestId { field: Arc::from(field.into()) }
}

impl LogRequestId {
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Middleware for LogRequestId {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let field = Arc::clone(&self.field);
        BoxedHandler::new(move |req: Request| {
            let ctx = req.context();
            let id = request_id::get(ctx);
            if !id.is_empty() {
                if let Some(log) = from_context(ctx) {
                    log.str(&*field, id);
                }
            }
            next.call(req)
        })
    }
}
