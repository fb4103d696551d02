//! Synchronous client for the Druid native query API.
//!
//! # Overview
//! A `Client` POSTs a JSON query to `{base_url}{endpoint}` over a pooled
//! HTTP transport and hands the raw 200 body to the query's own decoder.
//! Query types plug in through the `Query` trait; `JsonQuery` covers the
//! common case of an ad-hoc JSON body with a serde-decoded result.
//!
//! # Design
//! - Each client owns its transport (`ConnectionManager`), so clients with
//!   different pool or timeout settings can coexist in one process.
//! - Request building and response interpretation work on plain
//!   `HttpRequest` / `HttpResponse` values; the `Transport` trait is the
//!   only place that touches the network.
//! - No retries, no caching. Every error goes back to the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::{ClientConfig, TransportConfig};
pub use error::{BoxError, ClientError, Result};
pub use http::{HttpRequest, HttpResponse};
pub use query::{JsonQuery, Query};
pub use transport::{ConnectionManager, Transport};
pub use types::{ExecutionTrace, QueryContext};
