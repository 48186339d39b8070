//! The per-request descriptor a filter reads from and writes to.
//!
//! An [`Exchange`] pairs what the filter needs to know about the request
//! ([`RequestHead`]) with the response fields it is allowed to set
//! ([`ResponseHead`]). The host pipeline owns it; filters borrow it for the
//! duration of one call.

use http::header::{HOST, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

use crate::error::Error;

/// Header a TLS-terminating proxy uses to report the original scheme.
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// The request fields a redirect decision depends on.
#[derive(Clone, Debug, Default)]
pub struct RequestHead {
    pub scheme: String,
    pub headers: HeaderMap,
    pub path_base: String,
    pub path: String,
    pub query: Option<String>,
}

impl RequestHead {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Appends a `Host` value. Call twice to build a multi-valued header.
    ///
    /// # Panics
    ///
    /// Panics if `host` is not a legal header value. Use
    /// [`try_with_host`](Self::try_with_host) for untrusted input.
    pub fn with_host(self, host: &str) -> Self {
        self.try_with_host(host).expect("invalid host header value")
    }

    /// Fallible [`with_host`](Self::with_host).
    pub fn try_with_host(mut self, host: &str) -> Result<Self, Error> {
        let value = HeaderValue::from_str(host).map_err(|_| Error::InvalidHost)?;
        self.headers.append(HOST, value);
        Ok(self)
    }

    pub fn with_path_base(mut self, path_base: impl Into<String>) -> Self {
        self.path_base = path_base.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Builds a head from a hyper/http request.
    ///
    /// The scheme comes from the request target when it is absolute-form
    /// (`GET http://host/path`). Otherwise, when `trust_forwarded_proto` is
    /// set, the first `X-Forwarded-Proto` value is used. A plaintext listener
    /// falls back to `http`. `path_base` is always empty.
    pub fn from_parts(parts: &http::request::Parts, trust_forwarded_proto: bool) -> Self {
        let forwarded = || {
            parts.headers
                .get(&X_FORWARDED_PROTO)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(',').next().unwrap_or(v).trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let scheme = parts.uri.scheme_str()
            .map(str::to_owned)
            .or_else(|| if trust_forwarded_proto { forwarded() } else { None })
            .unwrap_or_else(|| "http".to_owned());

        let mut headers = parts.headers.clone();
        // HTTP/2 carries the host in the :authority pseudo-header, which hyper
        // exposes through the URI rather than the header map.
        if !headers.contains_key(HOST) {
            if let Some(authority) = parts.uri.authority() {
                if let Ok(value) = HeaderValue::from_str(authority.as_str()) {
                    headers.insert(HOST, value);
                }
            }
        }

        Self {
            scheme,
            headers,
            path_base: String::new(),
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
        }
    }
}

/// The response fields a filter may set.
#[derive(Clone, Debug, Default)]
pub struct ResponseHead {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
}

/// One request's descriptor: read the request half, write the response half.
#[derive(Clone, Debug, Default)]
pub struct Exchange {
    pub request: RequestHead,
    pub response: ResponseHead,
}

impl Exchange {
    pub fn new(request: RequestHead) -> Self {
        Self { request, response: ResponseHead::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(req: http::Request<()>) -> http::request::Parts {
        req.into_parts().0
    }

    #[test]
    fn origin_form_defaults_to_http() {
        let p = parts(http::Request::get("/a/b?x=1").header("host", "site.com").body(()).unwrap());
        let head = RequestHead::from_parts(&p, false);
        assert_eq!(head.scheme, "http");
        assert_eq!(head.path, "/a/b");
        assert_eq!(head.query.as_deref(), Some("x=1"));
        assert_eq!(head.path_base, "");
        assert_eq!(head.headers.get(HOST).unwrap(), "site.com");
    }

    #[test]
    fn absolute_form_uses_uri_scheme_and_authority() {
        let p = parts(http::Request::get("https://site.com:8443/x").body(()).unwrap());
        let head = RequestHead::from_parts(&p, false);
        assert_eq!(head.scheme, "https");
        assert_eq!(head.headers.get(HOST).unwrap(), "site.com:8443");
    }

    #[test]
    fn forwarded_proto_only_when_trusted() {
        let req = || {
            http::Request::get("/")
                .header("host", "site.com")
                .header("x-forwarded-proto", "https, http")
                .body(())
                .unwrap()
        };
        assert_eq!(RequestHead::from_parts(&parts(req()), false).scheme, "http");
        assert_eq!(RequestHead::from_parts(&parts(req()), true).scheme, "https");
    }

    #[test]
    fn try_with_host_rejects_control_characters() {
        let head = RequestHead::new("http", "/");
        assert!(matches!(head.clone().try_with_host("site.com\r\nx: y"), Err(Error::InvalidHost)));
        assert_eq!(head.try_with_host("site.com").unwrap().headers[HOST], "site.com");
    }

    #[test]
    #[should_panic(expected = "invalid host header value")]
    fn with_host_panics_on_illegal_value() {
        let _ = RequestHead::new("http", "/").with_host("bad\nhost");
    }

    #[test]
    fn with_host_appends_values() {
        let head = RequestHead::new("http", "/").with_host("a.com").with_host("b.com");
        let hosts: Vec<_> = head.headers.get_all(HOST).iter().collect();
        assert_eq!(hosts, ["a.com", "b.com"]);
    }
}
