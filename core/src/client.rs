//! Query executor: one request/response cycle per call.
//!
//! # Design
//! `Client` owns its normalized config and its transport. A call runs
//! `setup` → serialize → `build_query` → `Transport::send` →
//! `parse_response` → `on_response`, all on the caller's thread. There are
//! no retries and no caching; a failed attempt is reported as-is.
//!
//! In debug mode every call produces an `ExecutionTrace`. `execute_traced`
//! hands it back directly, which is the only race-free way to correlate a
//! trace with a call when one client is shared between threads. `execute`
//! additionally keeps the latest trace behind a mutex for `last_trace`;
//! with concurrent callers the last writer wins.

use std::sync::{Mutex, PoisonError};

use crate::config::{ClientConfig, TransportConfig};
use crate::error::{ClientError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::query::Query;
use crate::transport::{ConnectionManager, Transport};
use crate::types::ExecutionTrace;

pub struct Client {
    config: ClientConfig,
    query_url: String,
    transport: Box<dyn Transport>,
    last_trace: Mutex<Option<ExecutionTrace>>,
}

impl Client {
    /// Build a client with its own pooled connection manager.
    pub fn new(config: ClientConfig) -> Self {
        let transport = ConnectionManager::new(TransportConfig::from(&config));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        let config = config.normalized();
        let query_url = config.query_url();
        Self {
            config,
            query_url,
            transport: Box::new(transport),
            last_trace: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Serialize, send and decode `query`.
    pub fn execute<Q: Query>(&self, query: &mut Q) -> Result<()> {
        let (result, trace) = self.execute_traced(query);
        self.remember(trace);
        result
    }

    /// Like `execute`, but returns this call's trace (debug mode only)
    /// instead of storing it. The trace is returned even when the call fails.
    pub fn execute_traced<Q: Query>(&self, query: &mut Q) -> (Result<()>, Option<ExecutionTrace>) {
        query.setup();
        let body = match self.serialize(query) {
            Ok(body) => body,
            Err(err) => return (Err(err), None),
        };

        let (outcome, trace) = self.round_trip(body);
        let result = outcome.and_then(|response| {
            query.on_response(&response).map_err(ClientError::Decode)
        });
        (result, trace)
    }

    /// Send an already serialized query and return the raw 200 body.
    pub fn execute_raw(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let (result, trace) = self.round_trip(body);
        self.remember(trace);
        result
    }

    /// Trace of the most recent `execute`/`execute_raw` call in debug mode.
    pub fn last_trace(&self) -> Option<ExecutionTrace> {
        self.last_trace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// JSON body for `query`: two-space indented in debug mode, compact
    /// otherwise.
    pub fn serialize<Q: Query>(&self, query: &Q) -> Result<Vec<u8>> {
        let body = if self.config.debug {
            serde_json::to_vec_pretty(query)?
        } else {
            serde_json::to_vec(query)?
        };
        Ok(body)
    }

    pub fn build_query(&self, body: Vec<u8>) -> HttpRequest {
        HttpRequest::post_json(self.query_url.clone(), body)
    }

    fn round_trip(&self, body: Vec<u8>) -> (Result<Vec<u8>>, Option<ExecutionTrace>) {
        let request = self.build_query(body);
        tracing::debug!(url = %request.url, bytes = request.body.len(), "sending query");

        let sent = self.transport.send(&request);
        let trace = self.config.debug.then(|| ExecutionTrace {
            request_body: request.body,
            response_body: sent.as_ref().ok().map(|response| response.body.clone()),
        });
        if let Ok(response) = &sent {
            tracing::debug!(status = response.status, bytes = response.body.len(), "query answered");
        }

        (sent.and_then(parse_response), trace)
    }

    fn remember(&self, trace: Option<ExecutionTrace>) {
        if let Some(trace) = trace {
            *self.last_trace.lock().unwrap_or_else(PoisonError::into_inner) = Some(trace);
        }
    }
}

/// Anything but 200 is an error that keeps the raw body.
fn parse_response(response: HttpResponse) -> Result<Vec<u8>> {
    if response.is_ok() {
        return Ok(response.body);
    }
    Err(ClientError::Status {
        status: response.status,
        body: response.body,
    })
}
