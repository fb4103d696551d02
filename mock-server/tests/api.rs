use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Broker, RecordedQuery, Reply};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_returns_timeseries_row() {
    let resp = app(Broker::new())
        .oneshot(json_request(
            "/druid/v2",
            r#"{"queryType":"timeseries","context":{"queryId":"q-1"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let rows = body_json(resp).await;
    assert_eq!(rows[0]["result"]["queryType"], "timeseries");
    assert_eq!(rows[0]["result"]["queryId"], "q-1");
}

#[tokio::test]
async fn malformed_query_returns_400_with_error_payload() {
    let resp = app(Broker::new())
        .oneshot(json_request("/druid/v2", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error = body_json(resp).await;
    assert_eq!(error["error"], "Unknown exception");
    assert!(error["errorMessage"].is_string());
}

// --- scripted replies ---

#[tokio::test]
async fn fixed_reply_overrides_echo() {
    let broker = Broker::new();
    broker.set_reply(Reply::Fixed {
        status: 503,
        body: "unavailable".to_string(),
    });

    let resp = app(broker)
        .oneshot(json_request("/druid/v2", r#"{"queryType":"timeseries"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(&body_bytes(resp).await[..], b"unavailable");
}

// --- recording ---

#[tokio::test]
async fn records_body_and_query_string() {
    let broker = Broker::new();
    let body = "{\n  \"queryType\": \"timeBoundary\"\n}";
    let resp = app(broker.clone())
        .oneshot(json_request("/druid/v2?pretty", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        broker.received(),
        vec![RecordedQuery {
            query_string: Some("pretty".to_string()),
            body: body.as_bytes().to_vec(),
        }]
    );
}

// --- routing ---

#[tokio::test]
async fn get_is_not_allowed() {
    let resp = app(Broker::new())
        .oneshot(Request::builder().uri("/druid/v2").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unknown_path_returns_404() {
    let broker = Broker::new();
    let resp = app(broker.clone())
        .oneshot(json_request("/druid/v3", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(broker.received().is_empty());
}
