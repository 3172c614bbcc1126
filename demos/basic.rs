//! Minimal sheath example: one page that answers htmx with a fragment.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i -H 'HX-Request: true' http://localhost:3000/
//!   curl -i -H 'X-Request-ID: abc123' http://localhost:3000/

use sheath::middleware::{htmx, log, request_id::{self, RequestId}};
use sheath::{Request, Response, Server, chain};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), sheath::Error> {
    tracing_subscriber::fmt::init();

    let request_id = RequestId::new();
    let app = chain(page, &[
        &log::new_handler(),
        &request_id,
        &log::log_request_id("request_id"),
        &htmx::check_htmx,
    ]);

    Server::bind("0.0.0.0:3000").await?.serve(app).await
}

// The log line below is emitted inside the request span, so it carries
// `fields="request_id=…"` without the handler mentioning it.
async fn page(req: Request) -> Response {
    let id = request_id::get(req.context());

    if htmx::is_htmx(req.context()) {
        info!("rendering fragment");
        return Response::html(format!(r#"<p id="stamp">request {id}</p>"#));
    }

    info!("rendering full page");
    Response::html(format!(
        r##"<!doctype html>
<html>
  <head><script src="https://unpkg.com/htmx.org@2"></script></head>
  <body>
    <button hx-get="/" hx-target="#stamp" hx-swap="outerHTML">reload</button>
    <p id="stamp">request {id}</p>
  </body>
</html>"##
    ))
}
