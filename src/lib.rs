//! # https-only
//!
//! A request filter that pushes plaintext traffic onto HTTPS.
//!
//! Requests arriving over `http` are answered with a redirect to the same
//! URL on `https`. Requests that are already secure, or whose path is
//! excluded, are handed to the next stage unchanged.
//!
//! TLS itself is someone else's job: a proxy or load balancer in front of
//! the application terminates it. This crate only decides, per request,
//! whether to redirect.
//!
//! ## Exclusions
//!
//! - `/favicon.ico`: this exact path is never redirected.
//! - `/js/*`: nothing under the first-level folder `/js/` is redirected.
//!   Only first-level folders are supported.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use https_only::{HttpsOnly, Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let policy = HttpsOnly::create(44300, 301, &["/js/*", "/favicon.ico"])
//!         .expect("invalid redirect configuration");
//!
//!     Server::bind("0.0.0.0:8080")
//!         .https_only(policy)
//!         .serve(index)
//!         .await
//!         .unwrap();
//! }
//!
//! async fn index(_req: Request) -> Response {
//!     Response::html("<h1>Secure!</h1>")
//! }
//! ```
//!
//! ## Using the filter in another pipeline
//!
//! ```rust
//! use https_only::{Exchange, HttpsOnly, RequestHead};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), https_only::Error> {
//! let policy = HttpsOnly::default();
//! let mut exchange = Exchange::new(RequestHead::new("http", "/a").with_host("site.com"));
//!
//! policy.call(&mut exchange, |_| async { /* rest of the pipeline */ }).await?;
//!
//! assert_eq!(exchange.response.status.unwrap().as_u16(), 301);
//! assert_eq!(exchange.response.headers["location"], "https://site.com/a");
//! # Ok(())
//! # }
//! ```

mod error;
mod exchange;
mod exclusions;
mod request;
mod response;
mod server;
mod status;

pub mod middleware;

pub use error::Error;
pub use exchange::{Exchange, RequestHead, ResponseHead, X_FORWARDED_PROTO};
pub use exclusions::Exclusions;
pub use middleware::{Decision, HttpsOnly, HttpsOnlyBuilder, Redirect};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use server::Server;
pub use status::RedirectStatus;
