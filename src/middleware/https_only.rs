//! HTTP → HTTPS redirect filter.
//!
//! The decision for each request runs in four steps and stops at the first
//! one that applies:
//!
//! 1. Scheme is anything but `http` (case-insensitive) → continue.
//! 2. Path is an exact exclusion → continue.
//! 3. Path's first segment (`/js/` of `/js/app.js`) is a folder exclusion → continue.
//! 4. Otherwise redirect to `https://{host}[:{port}]{path_base}{path}[?{query}]`.
//!
//! The port of the incoming `Host` header is always dropped. The configured
//! port is appended unless it is 443.

use std::future::Future;

use http::header::{HOST, HeaderValue, LOCATION};
use tracing::{debug, trace};

use crate::error::Error;
use crate::exchange::{Exchange, RequestHead};
use crate::exclusions::Exclusions;
use crate::response::Response;
use crate::status::RedirectStatus;

const DEFAULT_HTTPS_PORT: u16 = 443;

/// What to do with one request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Hand the request to the next pipeline stage untouched.
    Continue,
    /// Answer with a redirect; the next stage is never reached.
    Redirect(Redirect),
}

/// A computed redirect: target URL plus the configured status.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Redirect {
    pub location: String,
    pub status: RedirectStatus,
}

impl Redirect {
    /// Bodiless response carrying the status and a `location` header.
    pub fn into_response(self) -> Response {
        Response::builder()
            .status(self.status.status_code())
            .header("location", &self.location)
            .no_body()
    }
}

/// Redirects plaintext requests to their HTTPS equivalent.
///
/// Immutable once built; share it behind an `Arc` across every connection.
///
/// ```rust
/// use https_only::{Decision, HttpsOnly, RequestHead};
///
/// let policy = HttpsOnly::create(44300, 301, &["/js/*", "/favicon.ico"]).unwrap();
///
/// let head = RequestHead::new("http", "/index.html").with_host("site.com");
/// match policy.decide(&head).unwrap() {
///     Decision::Redirect(r) => assert_eq!(r.location, "https://site.com:44300/index.html"),
///     Decision::Continue => unreachable!(),
/// }
///
/// let head = RequestHead::new("http", "/js/app.js").with_host("site.com");
/// assert_eq!(policy.decide(&head).unwrap(), Decision::Continue);
/// ```
#[derive(Clone, Debug)]
pub struct HttpsOnly {
    port: u16,
    status: RedirectStatus,
    exclusions: Exclusions,
}

impl HttpsOnly {
    /// Builds a policy from a raw status code.
    ///
    /// Fails with [`Error::InvalidConfiguration`] unless `code` is 301, 303
    /// or 307.
    pub fn create<S: AsRef<str>>(port: u16, code: u16, exclusions: &[S]) -> Result<Self, Error> {
        let status = RedirectStatus::try_from(code)?;
        Ok(Self::new(port, status, exclusions))
    }

    /// Builds a policy from an already-valid status.
    pub fn new<I, S>(port: u16, status: RedirectStatus, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exclusions = Exclusions::new(exclusions);
        debug!(
            port,
            status = %status,
            absolute = exclusions.absolute().map_or(0, |s| s.len()),
            partial = exclusions.partial().map_or(0, |s| s.len()),
            "https-only policy configured"
        );
        Self { port, status, exclusions }
    }

    pub fn builder() -> HttpsOnlyBuilder {
        HttpsOnlyBuilder::default()
    }

    pub fn port(&self) -> u16 { self.port }
    pub fn status(&self) -> RedirectStatus { self.status }
    pub fn exclusions(&self) -> &Exclusions { &self.exclusions }

    /// Whether `path` is exempt from redirection (steps 2 and 3).
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclusions.matches(path)
    }

    /// Judges one request without touching it.
    pub fn decide(&self, head: &RequestHead) -> Result<Decision, Error> {
        if !head.scheme.eq_ignore_ascii_case("http") {
            trace!(scheme = %head.scheme, "secure scheme, passing through");
            return Ok(Decision::Continue);
        }
        if self.exclusions.matches_absolute(&head.path) {
            trace!(path = %head.path, "absolute exclusion, passing through");
            return Ok(Decision::Continue);
        }
        if self.exclusions.matches_partial(&head.path) {
            trace!(path = %head.path, "partial exclusion, passing through");
            return Ok(Decision::Continue);
        }

        let location = self.location(head)?;
        debug!(%location, status = %self.status, "redirecting to https");
        Ok(Decision::Redirect(Redirect { location, status: self.status }))
    }

    /// Composes the HTTPS URL for `head`, ignoring scheme and exclusions.
    pub fn location(&self, head: &RequestHead) -> Result<String, Error> {
        let host = head.headers.get(HOST).ok_or(Error::MissingHost)?;
        let host = host.to_str().map_err(|_| Error::InvalidHost)?;

        // A colon in first position is kept; there is no host before it.
        let host = match host.find(':') {
            Some(colon) if colon > 0 => &host[..colon],
            _ => host,
        };

        let mut url = String::with_capacity(
            "https://".len() + host.len() + 6 + head.path_base.len() + head.path.len()
                + head.query.as_ref().map_or(0, |q| q.len() + 1),
        );
        url.push_str("https://");
        url.push_str(host);
        if self.port != DEFAULT_HTTPS_PORT {
            url.push(':');
            url.push_str(&self.port.to_string());
        }
        url.push_str(&head.path_base);
        url.push_str(&head.path);
        if let Some(query) = head.query.as_deref().filter(|q| !q.trim().is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        Ok(url)
    }

    /// Runs the filter as one stage of a pipeline.
    ///
    /// On pass-through `next` is called exactly once and awaited; nothing on
    /// the exchange is changed by the filter. On redirect the `Location`
    /// header (replacing any earlier value) and the status are written to
    /// `exchange.response`, `next` is dropped uncalled, and the returned
    /// future is ready on its first poll.
    pub async fn call<N, Fut>(&self, exchange: &mut Exchange, next: N) -> Result<(), Error>
    where
        N: FnOnce(&mut Exchange) -> Fut,
        Fut: Future<Output = ()>,
    {
        match self.decide(&exchange.request)? {
            Decision::Continue => {
                next(exchange).await;
            }
            Decision::Redirect(redirect) => {
                let location = HeaderValue::from_str(&redirect.location)?;
                exchange.response.headers.insert(LOCATION, location);
                exchange.response.status = Some(redirect.status.status_code());
            }
        }
        Ok(())
    }
}

impl Default for HttpsOnly {
    fn default() -> Self {
        Self::new(DEFAULT_HTTPS_PORT, RedirectStatus::default(), Vec::<String>::new())
    }
}

/// Fluent builder for [`HttpsOnly`].
///
/// Defaults: port 443, `301 Moved Permanently`, no exclusions.
///
/// ```rust
/// use https_only::{HttpsOnly, RedirectStatus};
///
/// let policy = HttpsOnly::builder()
///     .port(8443)
///     .status(RedirectStatus::TemporaryRedirect)
///     .exclude("/.well-known/*")
///     .exclude("/healthz")
///     .build()
///     .unwrap();
/// assert_eq!(policy.port(), 8443);
///
/// assert!(HttpsOnly::builder().status_code(302).build().is_err());
/// ```
#[derive(Debug)]
pub struct HttpsOnlyBuilder {
    port: u16,
    code: u16,
    exclusions: Vec<String>,
}

impl Default for HttpsOnlyBuilder {
    fn default() -> Self {
        Self {
            port: DEFAULT_HTTPS_PORT,
            code: RedirectStatus::default().as_u16(),
            exclusions: Vec::new(),
        }
    }
}

impl HttpsOnlyBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn status(mut self, status: RedirectStatus) -> Self {
        self.code = status.as_u16();
        self
    }

    /// Raw status code; an invalid value is reported by [`build`](Self::build).
    pub fn status_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Adds one exclusion. A trailing `/*` exempts the whole first-level folder.
    pub fn exclude(mut self, path: impl Into<String>) -> Self {
        self.exclusions.push(path.into());
        self
    }

    pub fn exclusions<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<HttpsOnly, Error> {
        HttpsOnly::create(self.port, self.code, &self.exclusions)
    }
}
