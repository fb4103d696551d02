//! Client construction settings.
//!
//! `ClientConfig` is what callers fill in (by hand or from their own config
//! files through serde). Zero or empty values mean "use the default";
//! `normalized` resolves them once, when the client is built.
//! `TransportConfig` adds the fixed transport constants on top.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "/druid/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 1000;
pub const DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST: usize = 300;

pub const DIAL_TIMEOUT: Duration = Duration::from_secs(30);
pub const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);
pub const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const EXPECT_CONTINUE_TIMEOUT: Duration = Duration::from_secs(1);

/// Query string appended to the endpoint in debug mode.
pub const PRETTY_MARKER: &str = "?pretty";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme, host and port of the broker, e.g. `http://localhost:8082`.
    pub base_url: String,
    #[serde(default)]
    pub endpoint: String,
    /// Bounds a whole call, connect through body read. Stored as
    /// `timeout_ms` in serialized configs.
    #[serde(default, rename = "timeout_ms", with = "duration_millis")]
    pub timeout: Duration,
    /// Pretty-print requests and keep an `ExecutionTrace` per call.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub max_idle_connections: usize,
    #[serde(default)]
    pub max_idle_connections_per_host: usize,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: String::new(),
            timeout: Duration::ZERO,
            debug: false,
            max_idle_connections: 0,
            max_idle_connections_per_host: 0,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_max_idle_connections(mut self, max: usize) -> Self {
        self.max_idle_connections = max;
        self
    }

    pub fn with_max_idle_connections_per_host(mut self, max: usize) -> Self {
        self.max_idle_connections_per_host = max;
        self
    }

    /// Effective settings: unset values replaced by their defaults and a
    /// trailing slash stripped from `base_url`.
    pub fn normalized(&self) -> Self {
        let endpoint = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            self.endpoint.clone()
        };
        let timeout = if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        };
        Self {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            endpoint,
            timeout,
            debug: self.debug,
            max_idle_connections: or_default(self.max_idle_connections, DEFAULT_MAX_IDLE_CONNECTIONS),
            max_idle_connections_per_host: or_default(
                self.max_idle_connections_per_host,
                DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST,
            ),
        }
    }

    /// Full URL of the query endpoint, with the pretty marker in debug mode.
    pub fn query_url(&self) -> String {
        let cfg = self.normalized();
        let marker = if cfg.debug { PRETTY_MARKER } else { "" };
        format!("{}{}{marker}", cfg.base_url, cfg.endpoint)
    }
}

fn or_default(value: usize, default: usize) -> usize {
    if value < 1 {
        default
    } else {
        value
    }
}

/// Settings of the pooled transport owned by one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub request_timeout: Duration,
    pub dial_timeout: Duration,
    pub handshake_timeout: Duration,
    pub idle_connection_timeout: Duration,
    pub expect_continue_timeout: Duration,
    pub max_idle_connections: usize,
    pub max_idle_connections_per_host: usize,
}

impl From<&ClientConfig> for TransportConfig {
    fn from(config: &ClientConfig) -> Self {
        let cfg = config.normalized();
        Self {
            request_timeout: cfg.timeout,
            dial_timeout: DIAL_TIMEOUT,
            handshake_timeout: TLS_HANDSHAKE_TIMEOUT,
            idle_connection_timeout: IDLE_CONNECTION_TIMEOUT,
            expect_continue_timeout: EXPECT_CONTINUE_TIMEOUT,
            max_idle_connections: cfg.max_idle_connections,
            max_idle_connections_per_host: cfg.max_idle_connections_per_host,
        }
    }
}

/// Serde adapter storing a `Duration` as whole milliseconds.
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
