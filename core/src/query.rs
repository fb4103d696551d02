//! The contract between the executor and concrete query types.
//!
//! A query serializes itself with serde and owns the decoding of its own
//! response. The executor never looks inside the broker's response envelope.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::BoxError;
use crate::types::QueryContext;

/// A request the broker understands, able to decode its own result.
pub trait Query: Serialize {
    /// Runs once per `execute`, before serialization. Variants use it to fill
    /// in computed fields such as a generated query context.
    fn setup(&mut self) {}

    /// Receives the raw body of a 200 response.
    fn on_response(&mut self, body: &[u8]) -> Result<(), BoxError>;
}

/// A query whose body is an arbitrary JSON object and whose result
/// deserializes into `R`.
///
/// `setup` makes sure the `context` carries a `queryId`, generating one when
/// the caller did not set it, so the query can be found in broker logs.
#[derive(Debug, Clone)]
pub struct JsonQuery<R> {
    pub body: serde_json::Map<String, serde_json::Value>,
    pub context: Option<QueryContext>,
    pub result: Option<R>,
}

impl<R> JsonQuery<R> {
    pub fn new(body: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            body,
            context: None,
            result: None,
        }
    }

    /// Build from a `serde_json::json!` value. Anything but an object is
    /// rejected since the broker only accepts JSON objects.
    pub fn from_value(value: serde_json::Value) -> Result<Self, BoxError> {
        match value {
            serde_json::Value::Object(body) => Ok(Self::new(body)),
            other => Err(format!("query body must be a JSON object, got {other}").into()),
        }
    }

    pub fn with_context(mut self, context: QueryContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn query_id(&self) -> Option<&str> {
        self.context.as_ref()?.query_id.as_deref()
    }
}

impl<R> Serialize for JsonQuery<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.body {
            if key == "context" && self.context.is_some() {
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        if let Some(context) = &self.context {
            map.serialize_entry("context", context)?;
        }
        map.end()
    }
}

impl<R: DeserializeOwned> Query for JsonQuery<R> {
    fn setup(&mut self) {
        let context = self.context.get_or_insert_with(QueryContext::default);
        if context.query_id.is_none() {
            context.query_id = Some(Uuid::new_v4().to_string());
        }
    }

    fn on_response(&mut self, body: &[u8]) -> Result<(), BoxError> {
        self.result = Some(serde_json::from_slice(body)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct TimeseriesRow {
        timestamp: String,
        result: serde_json::Value,
    }

    fn timeseries() -> JsonQuery<Vec<TimeseriesRow>> {
        JsonQuery::from_value(json!({
            "queryType": "timeseries",
            "dataSource": "wikipedia",
            "granularity": "all",
            "intervals": ["2015-09-12/2015-09-13"],
        }))
        .unwrap()
    }

    #[test]
    fn setup_generates_query_id_once() {
        let mut query = timeseries();
        query.setup();
        let first = query.query_id().unwrap().to_string();
        assert!(Uuid::parse_str(&first).is_ok());

        query.setup();
        assert_eq!(query.query_id().unwrap(), first);
    }

    #[test]
    fn setup_keeps_caller_query_id() {
        let mut query = timeseries().with_context(QueryContext {
            query_id: Some("dashboard-1".to_string()),
            ..QueryContext::default()
        });
        query.setup();
        assert_eq!(query.query_id(), Some("dashboard-1"));
    }

    #[test]
    fn serializes_body_with_context() {
        let mut query = timeseries();
        query.setup();
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["queryType"], "timeseries");
        assert_eq!(value["dataSource"], "wikipedia");
        assert_eq!(value["context"]["queryId"], query.query_id().unwrap());
    }

    #[test]
    fn explicit_context_replaces_body_context() {
        let mut body = serde_json::Map::new();
        body.insert("queryType".into(), json!("timeseries"));
        body.insert("context".into(), json!({"priority": 1}));
        let query = JsonQuery::<serde_json::Value>::new(body).with_context(QueryContext {
            timeout: Some(500),
            ..QueryContext::default()
        });
        let text = serde_json::to_string(&query).unwrap();
        assert_eq!(text.matches("\"context\"").count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["context"]["timeout"], 500);
    }

    #[test]
    fn rejects_non_object_body() {
        assert!(JsonQuery::<serde_json::Value>::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn on_response_fills_result() {
        let mut query = timeseries();
        query
            .on_response(br#"[{"timestamp":"2015-09-12T00:00:00.000Z","result":{"edits":39244}}]"#)
            .unwrap();
        let rows = query.result.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, "2015-09-12T00:00:00.000Z");
        assert_eq!(rows[0].result["edits"], 39244);
    }

    #[test]
    fn on_response_reports_shape_mismatch() {
        let mut query = timeseries();
        assert!(query.on_response(br#"{"error":"nope"}"#).is_err());
        assert!(query.result.is_none());
    }
}
