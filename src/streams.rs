//! Stream definitions
//!
//! Each stream is declared statically: its API path, where its records live
//! in the response, key fields, schema, and the per-record post-processing
//! hook. There is currently one stream, the `video_time_updates` event
//! extraction.

use crate::error::{Error, Result};
use crate::types::SyncMode;
use crate::window::DateWindow;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Name of the video time updates stream
pub const VIDEO_TIME_UPDATES: &str = "video_time_updates";

/// Static definition of one extraction stream
#[derive(Clone)]
pub struct StreamDef {
    /// Stream name, doubles as the `event_collection` query value
    pub name: &'static str,
    /// API path relative to the project URL
    pub path: &'static str,
    /// JSONPath to the records within a response body
    pub records_path: &'static str,
    /// Primary key field(s), dot notation for nested fields
    pub primary_keys: &'static [&'static str],
    /// Field used for incremental ordering (top-level, after post-processing)
    pub replication_key: &'static str,
    /// Default replication method
    pub replication_method: SyncMode,
    /// JSONPath to the pagination token in a response body
    pub token_path: &'static str,
    /// Whether the API returns records in replication-key order
    pub is_sorted: bool,
    /// Static JSON schema for emitted records
    pub schema: fn() -> Value,
    /// Per-record transformation applied before emission
    pub post_process: fn(Value) -> Result<Value>,
}

impl StreamDef {
    /// Query parameters for one request against this stream: the event
    /// collection plus the window serialized as a JSON `timeframe` object.
    ///
    /// Window bounds are explicit arguments here so request building never
    /// depends on mutable instance state.
    pub fn url_params(&self, window: &DateWindow) -> HashMap<String, String> {
        let timeframe = json!({
            "start": window.start.to_rfc3339(),
            "end": window.end.to_rfc3339(),
        });

        let mut params = HashMap::new();
        params.insert("event_collection".to_string(), self.name.to_string());
        params.insert("timeframe".to_string(), timeframe.to_string());
        params
    }

    /// The stream's JSON schema
    pub fn json_schema(&self) -> Value {
        (self.schema)()
    }

    /// Apply the stream's post-processing to one record
    pub fn post_process(&self, record: Value) -> Result<Value> {
        (self.post_process)(record)
    }
}

impl std::fmt::Debug for StreamDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDef")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("replication_key", &self.replication_key)
            .finish_non_exhaustive()
    }
}

/// All streams this tap knows about
pub fn all_streams() -> Vec<StreamDef> {
    vec![video_time_updates()]
}

/// Look up a stream by name
pub fn stream_by_name(name: &str) -> Result<StreamDef> {
    all_streams()
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::StreamNotFound {
            stream: name.to_string(),
        })
}

/// The video time updates event stream
pub fn video_time_updates() -> StreamDef {
    StreamDef {
        name: VIDEO_TIME_UPDATES,
        path: "queries/extraction",
        records_path: "$.result[*]",
        primary_keys: &["keen.id"],
        replication_key: "created_at",
        replication_method: SyncMode::Incremental,
        token_path: "$.next_page",
        is_sorted: true,
        schema: video_time_updates_schema,
        post_process: promote_keen_created_at,
    }
}

fn video_time_updates_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "created_at": {"type": "string", "format": "date-time"},
            "keen": {
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "timestamp": {"type": "string", "format": "date-time"}
                }
            }
        },
        "additionalProperties": true
    })
}

/// Promote the nested `keen.created_at` timestamp to a top-level field.
///
/// The declared replication key must exist at the top level for the state
/// tracker to read it, but the API nests it under the `keen` metadata
/// object. Any existing top-level `created_at` is overwritten. If removing
/// the timestamp leaves `keen` empty, the empty object is dropped too.
///
/// Returns a malformed-record error when the record is not an object, the
/// `keen` object is missing, or it carries no `created_at`.
pub fn promote_keen_created_at(mut record: Value) -> Result<Value> {
    let obj = record.as_object_mut().ok_or_else(|| {
        Error::malformed_record(VIDEO_TIME_UPDATES, "record is not a JSON object")
    })?;

    let created_at = {
        let keen = obj
            .get_mut("keen")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                Error::malformed_record(VIDEO_TIME_UPDATES, "missing 'keen' object")
            })?;

        keen.remove("created_at").ok_or_else(|| {
            Error::malformed_record(VIDEO_TIME_UPDATES, "missing 'keen.created_at' field")
        })?
    };

    if obj.get("keen").and_then(Value::as_object).is_some_and(serde_json::Map::is_empty) {
        obj.remove("keen");
    }

    obj.insert("created_at".to_string(), created_at);
    Ok(record)
}
