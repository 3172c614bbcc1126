//! # sheath
//!
//! Small, composable HTTP middleware, and just enough HTTP around it to run.
//!
//! ## The pieces
//!
//! - [`chain`] / [`Chain`]: wrap a handler in an ordered stack of
//!   [`Middleware`]. The first middleware listed is the outermost layer.
//! - [`middleware::htmx`]: flag requests sent by htmx (`HX-Request: true`).
//! - [`middleware::request_id`]: assign or propagate an `X-Request-ID`,
//!   readable from the request [`Context`] and echoed on the response.
//! - [`middleware::log`]: a tracing span per request with structured fields,
//!   including the request id.
//!
//! Every middleware communicates through the per-request [`Context`], an
//! immutable value store keyed by private types, so layers written
//! independently cannot trample each other's data.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sheath::middleware::{htmx, log, request_id::{self, RequestId}};
//! use sheath::{chain, Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sheath::Error> {
//!     let request_id = RequestId::new();
//!     let app = chain(page, &[
//!         &log::new_handler(),
//!         &request_id,
//!         &log::log_request_id("request_id"),
//!         &htmx::check_htmx,
//!     ]);
//!
//!     Server::bind("0.0.0.0:3000").await?.serve(app).await
//! }
//!
//! async fn page(req: Request) -> Response {
//!     let id = request_id::get(req.context());
//!     if htmx::is_htmx(req.context()) {
//!         Response::html(format!("<p>fragment for {id}</p>"))
//!     } else {
//!         Response::html(format!("<html><body><p>page for {id}</p></body></html>"))
//!     }
//! }
//! ```

mod chain;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod server;

pub mod middleware;

pub use chain::{Chain, Middleware, chain};
pub use context::Context;
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use server::Server;
