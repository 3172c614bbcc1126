//! Built-in middleware.
//!
//! Every item here implements [`Middleware`](crate::Middleware) and is meant
//! to be stacked with [`chain`](crate::chain) or [`Chain`](crate::Chain):
//!
//! - [`htmx`]: flags requests sent by htmx (`HX-Request: true`)
//! - [`request_id`]: assigns or propagates a correlation id
//! - [`log`]: per-request tracing span and structured fields, including
//!   the request id
//!
//! Order matters where one layer reads what another stored:
//!
//! ```rust
//! use sheath::middleware::{htmx, log, request_id::RequestId};
//! use sheath::{chain, Request};
//!
//! async fn app(_req: Request) -> &'static str { "ok" }
//!
//! let request_id = RequestId::new();
//! let handler = chain(app, &[
//!     &log::new_handler(),                  // span + log context first
//!     &request_id,                          // then the id
//!     &log::log_request_id("request_id"),   // needs both of the above
//!     &htmx::check_htmx,
//! ]);
//! ```

pub mod htmx;
pub mod log;
pub mod request_id;
