//! Unified error type.

use std::net::AddrParseError;

/// The error type returned by sheath's fallible setup operations.
///
/// Middleware and context accessors never fail: missing or malformed request
/// data degrades to a default. Application-level errors are HTTP
/// [`Response`](crate::Response) values. This type only surfaces
/// misconfiguration and infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`")]
    InvalidAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),
}
