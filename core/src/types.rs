//! The native query context and the per-call debug trace.

use serde::{Deserialize, Serialize};

/// The `context` object of a native query.
///
/// Only the keys the client itself touches are typed; anything else the
/// caller needs goes in `extra` and is passed through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    /// Broker-side timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Exact bytes exchanged by one call, kept only in debug mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionTrace {
    pub request_body: Vec<u8>,
    /// `None` when the call failed before a response arrived.
    pub response_body: Option<Vec<u8>>,
}

impl ExecutionTrace {
    pub fn request_text(&self) -> String {
        String::from_utf8_lossy(&self.request_body).into_owned()
    }

    pub fn response_text(&self) -> Option<String> {
        self.response_body
            .as_deref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }
}
