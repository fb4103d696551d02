//! Pooled HTTP transport.
//!
//! # Design
//! Each `Client` owns one `ConnectionManager`, which owns one `ureq::Agent`.
//! The agent keeps idle keep-alive connections and hands them back out for
//! later calls, so handshakes are paid once per pooled connection rather than
//! once per query. Nothing here is process-global: two clients built from
//! different configs get two independent pools.
//!
//! A connection only goes back to the pool once its response body has been
//! read to the end. `send` therefore always drains the body; on any error
//! the response is dropped, which closes the connection instead of parking a
//! half-read one in the pool.

use std::sync::Arc;

use ureq::Agent;

use crate::config::TransportConfig;
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one `HttpRequest` and returns the drained response.
///
/// Status codes are returned as data. Only failures to complete the exchange
/// (resolve, connect, TLS, timeout, read) are errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        (**self).send(request)
    }
}

/// The production `Transport`: a pooled, timeout-bounded `ureq::Agent`.
#[derive(Clone)]
pub struct ConnectionManager {
    agent: Agent,
    config: TransportConfig,
}

impl ConnectionManager {
    pub fn new(config: TransportConfig) -> Self {
        // ureq's connect phase covers both the TCP dial and the TLS handshake.
        let connect_timeout = config.dial_timeout + config.handshake_timeout;
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.request_timeout))
            .timeout_connect(Some(connect_timeout))
            .timeout_await_100(Some(config.expect_continue_timeout))
            .max_idle_connections(config.max_idle_connections)
            .max_idle_connections_per_host(config.max_idle_connections_per_host)
            .max_idle_age(config.idle_connection_timeout)
            .build()
            .new_agent();
        Self { agent, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for ConnectionManager {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder.send(&request.body[..])?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()?;
        tracing::trace!(status, bytes = body.len(), "response drained");

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::ClientConfig;

    #[test]
    fn manager_keeps_effective_settings() {
        let config = ClientConfig::new("http://broker:8082")
            .with_timeout(Duration::from_secs(3))
            .with_max_idle_connections(8);
        let manager = ConnectionManager::new(TransportConfig::from(&config));

        assert_eq!(manager.config().request_timeout, Duration::from_secs(3));
        assert_eq!(manager.config().max_idle_connections, 8);
        assert_eq!(manager.config().max_idle_connections_per_host, 300);
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        let config = ClientConfig::new("http://127.0.0.1:1").with_timeout(Duration::from_secs(2));
        let manager = ConnectionManager::new(TransportConfig::from(&config));
        let request = HttpRequest::post_json(config.query_url(), b"{}".to_vec());

        let err = manager.send(&request).unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
