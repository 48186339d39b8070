//! HTTP server, filter installation, and graceful shutdown.
//!
//! The server listens in plaintext and hands every request to one downstream
//! stage, the application. With an [`HttpsOnly`] policy installed, each
//! request is judged first:
//!
//! 1. Redirect → the redirect response is sent; the application never runs.
//! 2. Continue → the application answers.
//! 3. The request cannot be judged (no `Host`, non-ASCII `Host`) → `400 Bad Request`.
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets in-flight
//! connections finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::exchange::RequestHead;
use crate::middleware::{Decision, HttpsOnly};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    https_only: Option<HttpsOnly>,
    trust_forwarded_proto: bool,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use https_only::{HttpsOnly, Server};
    ///
    /// let server = Server::bind("0.0.0.0:8080").https_only(HttpsOnly::default());
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr, https_only: None, trust_forwarded_proto: false }
    }

    /// Judges every request with `policy` before the application sees it.
    pub fn https_only(mut self, policy: HttpsOnly) -> Self {
        self.https_only = Some(policy);
        self
    }

    /// Takes the request scheme from `X-Forwarded-Proto` when the request
    /// line does not carry one. Enable only behind a proxy that sets it.
    pub fn trust_forwarded_proto(mut self, trust: bool) -> Self {
        self.trust_forwarded_proto = trust;
        self
    }

    /// Serves `next` until SIGTERM or Ctrl-C, then drains.
    ///
    /// `next` is any `async fn(Request) -> impl IntoResponse`.
    pub async fn serve<H, Fut, R>(self, next: H) -> Result<(), Error>
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.serve_with_shutdown(next, shutdown_signal()).await
    }

    /// Serves `next` until `signal` resolves, then drains.
    pub async fn serve_with_shutdown<H, Fut, R, F>(self, next: H, signal: F) -> Result<(), Error>
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        let app = Arc::new(App {
            next,
            https_only: self.https_only,
            trust_forwarded_proto: self.trust_forwarded_proto,
        });

        info!(
            addr = %local_addr,
            https_only = app.https_only.is_some(),
            "https-only listening"
        );

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown is checked first so queued connections are not
                // accepted once the signal has fired.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("https-only stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

struct App<H> {
    next: H,
    https_only: Option<HttpsOnly>,
    trust_forwarded_proto: bool,
}

/// Filter, then hand over to the application. Every failure becomes a
/// response, so hyper never sees an error.
async fn dispatch<H, Fut, R, B>(
    app: Arc<App<H>>,
    req: http::Request<B>,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    H: Fn(Request) -> Fut,
    Fut: Future<Output = R>,
    R: IntoResponse,
    B: Body,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();

    if let Some(policy) = &app.https_only {
        let head = RequestHead::from_parts(&parts, app.trust_forwarded_proto);
        match policy.decide(&head) {
            Ok(Decision::Continue) => {}
            Ok(Decision::Redirect(redirect)) => {
                return Ok(redirect.into_response().into_inner());
            }
            Err(e) => {
                warn!(path = %head.path, "cannot judge request: {e}");
                return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
            }
        }
    }

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(path = %parts.uri.path(), "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let response = (app.next)(Request::new(parts, body)).await.into_response();
    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM (Unix) or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HOST, HeaderValue, LOCATION};

    async fn site(req: Request) -> Response {
        match req.path() {
            "/echo" => Response::text(String::from_utf8_lossy(req.body()).into_owned()),
            "/whoami" => Response::text(format!(
                "{}?{}",
                req.header("host").unwrap_or("-"),
                req.query().unwrap_or(""),
            )),
            _ => Response::html("<h1>Secure!</h1>"),
        }
    }

    fn reference_policy() -> Option<HttpsOnly> {
        Some(HttpsOnly::create(44300, 301, &["/js/*", "/favicon.ico"]).unwrap())
    }

    async fn run(
        https_only: Option<HttpsOnly>,
        trust_forwarded_proto: bool,
        req: http::Request<Full<Bytes>>,
    ) -> http::Response<Full<Bytes>> {
        let app = Arc::new(App { next: site, https_only, trust_forwarded_proto });
        dispatch(app, req).await.unwrap()
    }

    fn request(uri: &str, host: Option<&str>) -> http::Request<Full<Bytes>> {
        let mut builder = http::Request::builder().method(http::Method::POST).uri(uri);
        if let Some(host) = host {
            builder = builder.header("host", host);
        }
        builder.body(Full::new(Bytes::from_static(b"payload"))).unwrap()
    }

    fn forwarded(uri: &str, host: &str) -> http::Request<Full<Bytes>> {
        let mut req = request(uri, Some(host));
        req.headers_mut().insert("x-forwarded-proto", "https".parse().unwrap());
        req
    }

    async fn body_of(res: http::Response<Full<Bytes>>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn plaintext_request_is_redirected() {
        let res = run(reference_policy(), false, request("/index.html?a=1", Some("site.com:8080"))).await;
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.headers()[LOCATION], "https://site.com:44300/index.html?a=1");
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn excluded_paths_reach_the_application() {
        for path in ["/favicon.ico", "/js/app.js", "/js/missing.js"] {
            let res = run(reference_policy(), false, request(path, Some("site.com"))).await;
            assert_eq!(res.status(), StatusCode::OK, "{path}");
            assert_eq!(body_of(res).await, "<h1>Secure!</h1>");
        }
    }

    #[tokio::test]
    async fn absolute_form_https_passes_through() {
        let res = run(reference_policy(), false, request("https://site.com/index.html", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_proto_is_honoured_only_when_trusted() {
        let untrusted = run(reference_policy(), false, forwarded("/index.html", "site.com")).await;
        assert_eq!(untrusted.status(), StatusCode::MOVED_PERMANENTLY);

        let trusted = run(reference_policy(), true, forwarded("/index.html", "site.com")).await;
        assert_eq!(trusted.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_host_is_bad_request() {
        let res = run(reference_policy(), false, request("/index.html", None)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_ascii_host_is_bad_request() {
        let mut req = request("/index.html", None);
        req.headers_mut().insert(HOST, HeaderValue::from_bytes(b"caf\xe9.com").unwrap());
        let res = run(reference_policy(), false, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn application_sees_body_headers_and_query() {
        let res = run(reference_policy(), true, forwarded("/echo", "site.com")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_of(res).await, "payload");

        let res = run(reference_policy(), true, forwarded("/whoami?x=1", "site.com")).await;
        assert_eq!(body_of(res).await, "site.com?x=1");
    }

    #[tokio::test]
    async fn without_policy_everything_reaches_the_application() {
        let res = run(None, false, request("/index.html", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn serve_with_shutdown_stops_on_signal() {
        let server = Server::bind("127.0.0.1:0").https_only(HttpsOnly::default());
        server.serve_with_shutdown(site, std::future::ready(())).await.unwrap();
    }
}
