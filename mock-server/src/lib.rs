use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    serve::ListenerExt,
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const QUERY_PATH: &str = "/druid/v2";

/// One POST as the broker saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedQuery {
    /// Raw query string, e.g. `Some("pretty")`.
    pub query_string: Option<String>,
    pub body: Vec<u8>,
}

/// How the broker answers the next queries.
#[derive(Clone, Debug, Default)]
pub enum Reply {
    /// Answer with a one-row timeseries result echoing the request's
    /// `queryType` and `context.queryId`.
    #[default]
    Echo,
    /// Answer every query with this status and body.
    Fixed { status: u16, body: String },
    /// Hold the request for this long, then echo.
    Stall(Duration),
}

#[derive(Default)]
struct BrokerState {
    reply: Mutex<Reply>,
    received: Mutex<Vec<RecordedQuery>>,
    connections: AtomicUsize,
}

/// Shared handle on the fake broker: scripts replies and exposes what was
/// received. Cheap to clone; all clones see the same state.
#[derive(Clone, Default)]
pub struct Broker {
    state: Arc<BrokerState>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reply(&self, reply: Reply) {
        *lock(&self.state.reply) = reply;
    }

    pub fn received(&self) -> Vec<RecordedQuery> {
        lock(&self.state.received).clone()
    }

    /// TCP connections accepted since the broker started serving.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn app(broker: Broker) -> Router {
    Router::new()
        .route(QUERY_PATH, post(query))
        .with_state(broker)
}

pub async fn run(listener: TcpListener, broker: Broker) -> Result<(), std::io::Error> {
    let counter = broker.clone();
    let listener = listener.tap_io(move |_| {
        counter.state.connections.fetch_add(1, Ordering::SeqCst);
    });
    axum::serve(listener, app(broker)).await
}

async fn query(State(broker): State<Broker>, RawQuery(query_string): RawQuery, body: Bytes) -> Response {
    tracing::debug!(bytes = body.len(), query_string = ?query_string, "query received");
    lock(&broker.state.received).push(RecordedQuery {
        query_string,
        body: body.to_vec(),
    });

    let reply = lock(&broker.state.reply).clone();
    match reply {
        Reply::Fixed { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body).into_response()
        }
        Reply::Echo => echo(&body),
        Reply::Stall(delay) => {
            tokio::time::sleep(delay).await;
            echo(&body)
        }
    }
}

fn echo(body: &[u8]) -> Response {
    let request: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            let error = json!({
                "error": "Unknown exception",
                "errorMessage": err.to_string(),
                "errorClass": "com.fasterxml.jackson.core.JsonParseException",
            });
            return json_response(StatusCode::BAD_REQUEST, &error);
        }
    };

    let rows = json!([{
        "timestamp": "2015-09-12T00:00:00.000Z",
        "result": {
            "queryType": request["queryType"],
            "queryId": request["context"]["queryId"],
            "count": 1,
        },
    }]);
    json_response(StatusCode::OK, &rows)
}

fn json_response(status: StatusCode, value: &Value) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], value.to_string()).into_response()
}
