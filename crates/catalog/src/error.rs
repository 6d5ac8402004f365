//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! The kinds are [`Clone`] on purpose: a token refresh is shared between every
//! caller that was waiting on it, and each of them needs its own copy of the
//! outcome.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The provider is throttling us. Providers *may* send a retry hint, but
    /// it is not reliable enough to depend on: back off on our own schedule.
    #[display("rate limited by catalog")]
    RateLimited,
    /// Access credential is invalid or expired; refresh and try again.
    #[display("catalog rejected access token")]
    Unauthorized,
    /// The requested artist/item does not exist in the catalog.
    #[display("not found in catalog: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Transport failure or unexpected HTTP status.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The catalog answered, but not with anything we could decode.
    #[display("invalid catalog response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// Refreshing the access token itself failed.
    #[display("unable to obtain catalog credentials: {_0}")]
    Credentials(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::RateLimited, true)]
    #[case(ErrorKind::Unauthorized, true)]
    #[case(ErrorKind::NotFound("abc".to_string()), false)]
    #[case(ErrorKind::Network("connection reset".to_string()), false)]
    #[case(ErrorKind::InvalidResponse("missing field".to_string()), false)]
    #[case(ErrorKind::Credentials("bad secret".to_string()), false)]
    fn test_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::NotFound("spotify:album:1".to_string()).to_string(), "not found in catalog: spotify:album:1");
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate limited by catalog");
    }
}
