//! Error types for the query client.
//!
//! # Design
//! Every failure of a single `execute` call lands in exactly one variant.
//! Non-200 responses keep the raw body so callers can parse the broker's own
//! error payload. Decode failures belong to the query variant and are carried
//! as an opaque boxed error.

use ureq::http::StatusCode;

/// Boxed error produced by a query's decode hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by `Client` and `Transport` implementations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The query could not be serialized to JSON. Nothing was sent.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// DNS, connect, TLS, timeout or body-read failure.
    #[error("transport failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The broker answered with something other than 200 OK.
    #[error("{}: {}", status_line(*.status), String::from_utf8_lossy(.body))]
    Status { status: u16, body: Vec<u8> },

    /// The query's decode hook rejected the response body.
    #[error("decode failed: {0}")]
    Decode(#[source] BoxError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Render a status code the way an HTTP status line reads, e.g.
/// `503 Service Unavailable`.
pub fn status_line(status: u16) -> String {
    match StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
    {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    }
}
