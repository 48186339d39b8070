//! Redirect status codes as a typed enum.
//!
//! Only three codes make sense for an HTTP → HTTPS hop, so only three are
//! representable. Raw integers go through [`TryFrom<u16>`], which is the one
//! place an invalid code is rejected.
//!
//! ```rust
//! use https_only::RedirectStatus;
//!
//! assert_eq!(RedirectStatus::try_from(307).unwrap(), RedirectStatus::TemporaryRedirect);
//! assert!(RedirectStatus::try_from(302).is_err());
//! assert_eq!(u16::from(RedirectStatus::default()), 301);
//! ```

use std::fmt;

use http::StatusCode;

use crate::error::Error;

/// The status written on a redirect response.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum RedirectStatus {
    /// `301 Moved Permanently`. Cached by browsers; POST may become GET.
    #[default]
    MovedPermanently,  // 301
    /// `303 See Other`. The follow-up request is always a GET.
    SeeOther,          // 303
    /// `307 Temporary Redirect`. Method and body are preserved.
    TemporaryRedirect, // 307
}

impl RedirectStatus {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::MovedPermanently  => 301,
            Self::SeeOther          => 303,
            Self::TemporaryRedirect => 307,
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            Self::MovedPermanently  => StatusCode::MOVED_PERMANENTLY,
            Self::SeeOther          => StatusCode::SEE_OTHER,
            Self::TemporaryRedirect => StatusCode::TEMPORARY_REDIRECT,
        }
    }
}

impl TryFrom<u16> for RedirectStatus {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            301 => Ok(Self::MovedPermanently),
            303 => Ok(Self::SeeOther),
            307 => Ok(Self::TemporaryRedirect),
            _   => Err(Error::InvalidConfiguration { code }),
        }
    }
}

impl From<RedirectStatus> for u16 {
    fn from(s: RedirectStatus) -> u16 {
        s.as_u16()
    }
}

impl From<RedirectStatus> for StatusCode {
    fn from(s: RedirectStatus) -> StatusCode {
        s.status_code()
    }
}

impl fmt::Display for RedirectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_the_three_redirect_codes() {
        for code in 0..=999u16 {
            let parsed = RedirectStatus::try_from(code);
            match code {
                301 | 303 | 307 => assert_eq!(parsed.unwrap().as_u16(), code),
                _ => assert!(
                    matches!(parsed, Err(Error::InvalidConfiguration { code: c }) if c == code),
                    "{code} should be rejected"
                ),
            }
        }
    }

    #[test]
    fn status_code_matches_numeric_value() {
        for s in [
            RedirectStatus::MovedPermanently,
            RedirectStatus::SeeOther,
            RedirectStatus::TemporaryRedirect,
        ] {
            assert_eq!(s.status_code().as_u16(), u16::from(s));
        }
    }

    #[test]
    fn defaults_to_moved_permanently() {
        assert_eq!(RedirectStatus::default(), RedirectStatus::MovedPermanently);
        assert_eq!(RedirectStatus::default().to_string(), "301");
    }
}
