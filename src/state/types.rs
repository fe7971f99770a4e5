//! State types for tracking replication progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::error::{Error, Result};
use crate::window::parse_datetime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete replication state for the tap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: HashMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.streams.entry(stream.to_string()).or_default()
    }

    /// Get the last committed replication value for a stream
    pub fn replication_value(&self, stream: &str) -> Option<&str> {
        self.streams.get(stream)?.replication_key_value.as_deref()
    }

    /// Set the replication value for a stream without an ordering check
    pub fn set_replication_value(&mut self, stream: &str, value: String) {
        self.get_stream_mut(stream).replication_key_value = Some(value);
    }

    /// Advance the replication value for a stream.
    ///
    /// The new value must parse as a timestamp and compare greater than or
    /// equal to the stored value under timestamp ordering; moving backwards
    /// is rejected so replayed or reordered windows cannot regress committed
    /// progress. Equal values are accepted (re-committing a boundary is
    /// idempotent).
    pub fn advance(&mut self, stream: &str, new_value: &str) -> Result<()> {
        let new_ts = parse_datetime(new_value).map_err(|_| {
            Error::state(format!(
                "replication value '{new_value}' for stream '{stream}' is not a timestamp"
            ))
        })?;

        let current_ts = match self.replication_value(stream) {
            Some(current) => Some(parse_datetime(current).map_err(|_| {
                Error::state(format!(
                    "stored replication value '{current}' for stream '{stream}' is not a timestamp"
                ))
            })?),
            None => None,
        };

        if let Some(current_ts) = current_ts {
            if new_ts < current_ts {
                return Err(Error::state(format!(
                    "refusing to move replication value for stream '{stream}' backwards \
                     ({new_value} < stored {current_ts})"
                )));
            }
        }

        self.set_replication_value(stream, new_value.to_string());
        Ok(())
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamState {
    /// Last committed value of the stream's replication key
    #[serde(default)]
    pub replication_key_value: Option<String>,
}

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }
}
