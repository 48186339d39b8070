//! Plaintext site that sends every visitor to HTTPS, except for scripts and
//! the favicon.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:8080/index.html    → 301, Location: https://localhost:44300/index.html
//!   curl -i http://localhost:8080/favicon.ico   → 200
//!   curl -i http://localhost:8080/js/app.js     → 200
//!   curl -i -H 'x-forwarded-proto: https' http://localhost:8080/index.html   → 200

use https_only::{ContentType, HttpsOnly, Request, Response, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let policy = HttpsOnly::create(44300, 301, &["/js/*", "/favicon.ico"])
        .expect("invalid redirect configuration");

    Server::bind("0.0.0.0:8080")
        .https_only(policy)
        .trust_forwarded_proto(true)
        .serve(secure)
        .await
        .expect("server error");
}

// Everything the filter lets through lands here.
async fn secure(req: Request) -> Response {
    if req.path().starts_with("/js/") {
        return Response::builder().bytes(ContentType::OctetStream, Vec::new());
    }
    Response::html("<h1>Secure!</h1>")
}
