//! Response record extraction
//!
//! Given a parsed response body and a JSONPath identifying the record
//! collection (`$.result[*]` for the extraction endpoint), yields the record
//! objects in document order. Pass-through only: no reordering, no
//! deduplication.

use crate::error::{Error, Result};
use serde_json::Value;

/// Extracts records from parsed JSON response bodies at a fixed path
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    /// JSONPath to the record collection
    records_path: String,
}

impl RecordExtractor {
    /// Create an extractor for the given records path
    pub fn new(records_path: impl Into<String>) -> Self {
        Self {
            records_path: records_path.into(),
        }
    }

    /// The configured records path
    pub fn path(&self) -> &str {
        &self.records_path
    }

    /// Parse a raw response body as JSON
    pub fn decode(&self, body: &str) -> Result<Value> {
        serde_json::from_str(body)
            .map_err(|e| Error::decode(format!("Failed to parse response JSON: {e}")))
    }

    /// Extract the record objects from a parsed body, in document order.
    ///
    /// A path that matches nothing yields an empty vec rather than an error;
    /// an empty page is a normal end-of-window condition.
    pub fn extract(&self, body: &Value) -> Result<Vec<Value>> {
        // Simple dot paths are resolved directly; wildcard paths go through
        // jsonpath-rust.
        if self.records_path.contains('*') {
            extract_with_jsonpath(body, &self.records_path)
        } else {
            match extract_simple_path(body, &self.records_path) {
                Some(Value::Array(arr)) => Ok(arr),
                Some(v) => Ok(vec![v]),
                None => Ok(vec![]),
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a value using simple dot-notation path
pub(crate) fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let parts: Vec<&str> = path.split('.').collect();

    let mut current = value;
    for part in parts {
        current = current.get(part)?;
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::json_path(format!("Invalid JSONPath: {e}")))?;

    let result = jp.find(value);

    match result {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn extraction_body() -> Value {
        json!({
            "result": [
                {"keen": {"id": "a", "created_at": "2022-03-15T00:10:00Z"}, "seconds": 10},
                {"keen": {"id": "b", "created_at": "2022-03-15T00:20:00Z"}, "seconds": 20},
                {"keen": {"id": "c", "created_at": "2022-03-15T00:30:00Z"}, "seconds": 30}
            ],
            "next_page": "tok-1"
        })
    }

    #[test]
    fn test_extract_result_wildcard() {
        let extractor = RecordExtractor::new("$.result[*]");
        let records = extractor.extract(&extraction_body()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["keen"]["id"], "a");
        assert_eq!(records[2]["seconds"], 30);
    }

    #[test]
    fn test_extract_preserves_order() {
        let extractor = RecordExtractor::new("$.result[*]");
        let records = extractor.extract(&extraction_body()).unwrap();

        let ids: Vec<&str> = records
            .iter()
            .map(|r| r["keen"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_extract_empty_result() {
        let extractor = RecordExtractor::new("$.result[*]");
        let records = extractor.extract(&json!({"result": []})).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_extract_missing_path_yields_empty() {
        let extractor = RecordExtractor::new("$.result[*]");
        let records = extractor.extract(&json!({"other": 1})).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_extract_simple_path_array() {
        let extractor = RecordExtractor::new("$.result");
        let records = extractor
            .extract(&json!({"result": [{"x": 1}, {"x": 2}]}))
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_extract_simple_path_single_object() {
        let extractor = RecordExtractor::new("$.data.item");
        let records = extractor
            .extract(&json!({"data": {"item": {"x": 1}}}))
            .unwrap();
        assert_eq!(records, vec![json!({"x": 1})]);
    }

    #[test]
    fn test_decode_valid_and_invalid() {
        let extractor = RecordExtractor::new("$.result[*]");

        let body = extractor.decode(r#"{"result": [], "next_page": null}"#).unwrap();
        assert!(body["next_page"].is_null());

        let err = extractor.decode("not json at all").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
