//! Unified error type.

use std::fmt;

use http::header::InvalidHeaderValue;

/// The error type returned by https-only's fallible operations.
///
/// Only [`Error::InvalidConfiguration`] can come out of constructing a
/// policy. The request-time variants mean the caller handed the filter a
/// descriptor it cannot judge; they are never produced for a request that
/// is passed through.
#[derive(Debug)]
pub enum Error {
    /// The redirect status code is not one of 301, 303 or 307.
    InvalidConfiguration { code: u16 },
    /// A redirect is required but the request carries no `Host` header.
    MissingHost,
    /// The `Host` header is not visible ASCII.
    InvalidHost,
    /// The composed redirect target is not a legal header value.
    InvalidLocation(InvalidHeaderValue),
    /// Binding or accepting on the listener failed.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration { code } => write!(
                f,
                "invalid configuration: redirect code must be either 301, 303 or 307 (got {code})"
            ),
            Self::MissingHost => f.write_str("request has no host header"),
            Self::InvalidHost => f.write_str("host header is not valid ascii"),
            Self::InvalidLocation(e) => write!(f, "invalid location: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidLocation(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<InvalidHeaderValue> for Error {
    fn from(e: InvalidHeaderValue) -> Self {
        Self::InvalidLocation(e)
    }
}
