//! Engine types
//!
//! Message types, the output sink seam, and sync statistics.

use crate::error::Result;
use crate::types::LogLevel;
use chrono::Utc;
use serde_json::{json, Value};
use std::io::Write;

// ============================================================================
// Messages
// ============================================================================

/// A message emitted during sync, in wire order: SCHEMA first, then RECORDs
/// interleaved with STATEs at window boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Stream schema announcement
    Schema {
        /// Stream name
        stream: String,
        /// JSON schema of emitted records
        schema: Value,
        /// Primary key field paths
        key_properties: Vec<String>,
    },
    /// One extracted, post-processed record
    Record {
        /// Stream name
        stream: String,
        /// The record data
        data: Value,
        /// When the record was emitted (RFC 3339)
        emitted_at: String,
    },
    /// Full replication-state snapshot
    State {
        /// State data (all streams)
        data: Value,
    },
    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(stream: impl Into<String>, schema: Value, key_properties: Vec<String>) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
        }
    }

    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, data: Value) -> Self {
        Self::Record {
            stream: stream.into(),
            data,
            emitted_at: Utc::now().to_rfc3339(),
        }
    }

    /// Create a state message
    pub fn state(data: Value) -> Self {
        Self::State { data }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create an error log
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Check if this is a log message
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }

    /// Serialize to the wire format
    pub fn to_json(&self) -> Value {
        match self {
            Self::Schema {
                stream,
                schema,
                key_properties,
            } => json!({
                "type": "SCHEMA",
                "stream": stream,
                "schema": schema,
                "key_properties": key_properties,
            }),
            Self::Record {
                stream,
                data,
                emitted_at,
            } => json!({
                "type": "RECORD",
                "record": {
                    "stream": stream,
                    "data": data,
                    "emitted_at": emitted_at,
                },
            }),
            Self::State { data } => json!({
                "type": "STATE",
                "state": data,
            }),
            Self::Log { level, message } => json!({
                "type": "LOG",
                "log": {
                    "level": level,
                    "message": message,
                },
            }),
        }
    }
}

// ============================================================================
// Message Sink
// ============================================================================

/// Where emitted messages go.
///
/// The engine writes each record through the sink before committing the
/// window's state, so at the moment state advances the records it covers are
/// already downstream.
pub trait MessageSink {
    /// Write one message
    fn write(&mut self, message: Message) -> Result<()>;
}

/// Sink that serializes each message as one JSON line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink over a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for JsonLinesSink<W> {
    fn write(&mut self, message: Message) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &message.to_json())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Collecting sink for tests
impl MessageSink for Vec<Message> {
    fn write(&mut self, message: Message) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

// ============================================================================
// Sync Stats
// ============================================================================

/// Statistics from a sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total records emitted
    pub records_emitted: usize,
    /// Records dropped by post-processing
    pub records_dropped: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Total windows completed
    pub windows_completed: usize,
    /// Total streams synced
    pub streams_synced: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add emitted records
    pub fn add_records(&mut self, count: usize) {
        self.records_emitted += count;
    }

    /// Count a dropped record
    pub fn add_dropped(&mut self) {
        self.records_dropped += 1;
    }

    /// Count a fetched page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Count a completed window
    pub fn add_window(&mut self) {
        self.windows_completed += 1;
    }

    /// Count a synced stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

#[cfg(test)]
mod message_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_schema_message_wire_format() {
        let msg = Message::schema(
            "video_time_updates",
            json!({"type": "object"}),
            vec!["keen.id".to_string()],
        );
        assert_eq!(
            msg.to_json(),
            json!({
                "type": "SCHEMA",
                "stream": "video_time_updates",
                "schema": {"type": "object"},
                "key_properties": ["keen.id"],
            })
        );
    }

    #[test]
    fn test_record_message_wire_format() {
        let msg = Message::record("video_time_updates", json!({"created_at": "2022-01-01T00:00:00Z"}));
        let wire = msg.to_json();

        assert_eq!(wire["type"], "RECORD");
        assert_eq!(wire["record"]["stream"], "video_time_updates");
        assert_eq!(wire["record"]["data"]["created_at"], "2022-01-01T00:00:00Z");
        assert!(wire["record"]["emitted_at"].is_string());
    }

    #[test]
    fn test_state_message_wire_format() {
        let msg = Message::state(json!({"streams": {}}));
        assert_eq!(
            msg.to_json(),
            json!({"type": "STATE", "state": {"streams": {}}})
        );
    }

    #[test]
    fn test_log_message_wire_format() {
        let msg = Message::error("record dropped");
        assert_eq!(
            msg.to_json(),
            json!({"type": "LOG", "log": {"level": "ERROR", "message": "record dropped"}})
        );
    }

    #[test]
    fn test_message_predicates() {
        assert!(Message::record("s", json!({})).is_record());
        assert!(Message::state(json!({})).is_state());
        assert!(Message::info("x").is_log());
        assert!(!Message::info("x").is_record());
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.write(Message::state(json!({"streams": {}}))).unwrap();
        sink.write(Message::info("done")).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "STATE");
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<Message> = Vec::new();
        sink.write(Message::info("a")).unwrap();
        sink.write(Message::info("b")).unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_sync_stats() {
        let mut stats = SyncStats::new();
        stats.add_records(10);
        stats.add_records(5);
        stats.add_dropped();
        stats.add_page();
        stats.add_window();
        stats.add_stream();
        stats.set_duration(1234);

        assert_eq!(stats.records_emitted, 15);
        assert_eq!(stats.records_dropped, 1);
        assert_eq!(stats.pages_fetched, 1);
        assert_eq!(stats.windows_completed, 1);
        assert_eq!(stats.streams_synced, 1);
        assert_eq!(stats.duration_ms, 1234);
    }
}
