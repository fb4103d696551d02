//! HTTP exchange types shared by the executor and the transport.
//!
//! # Design
//! Requests and responses are plain data. `Client` builds an `HttpRequest`,
//! hands it to a `Transport`, and interprets the `HttpResponse` it gets back.
//! Keeping the exchange as values lets the executor be exercised against a
//! fake transport with no sockets involved.

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A query POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL including any query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn post_json(url: String, body: Vec<u8>) -> Self {
        Self {
            url,
            headers: vec![("content-type".to_string(), CONTENT_TYPE_JSON.to_string())],
            body,
        }
    }
}

/// A fully drained HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}
