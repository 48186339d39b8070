//! Middleware layer.
//!
//! Middleware judges a request before routing and may answer it on the spot.
//! The one built-in filter is [`HttpsOnly`], which turns plaintext requests
//! into redirects to their HTTPS equivalent.
//!
//! Install it on the [`Server`](crate::Server) or drive it yourself through
//! [`HttpsOnly::call`] with an [`Exchange`](crate::Exchange) and a `next`
//! continuation.

mod https_only;

pub use https_only::{Decision, HttpsOnly, HttpsOnlyBuilder, Redirect};
