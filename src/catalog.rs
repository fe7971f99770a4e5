//! Catalog types for discovery and stream selection
//!
//! `discover` emits a [`Catalog`] built from the static stream definitions;
//! `sync` optionally consumes a [`ConfiguredCatalog`] that selects streams
//! and overrides their sync mode.

use crate::error::{Error, Result};
use crate::streams::{self, StreamDef};
use crate::types::SyncMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Catalog of streams a tap can extract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Available streams
    pub streams: Vec<CatalogStream>,
}

/// One stream entry in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStream {
    /// Stream name
    pub name: String,

    /// JSON schema for emitted records
    pub json_schema: Value,

    /// Sync modes the stream supports
    pub supported_sync_modes: Vec<SyncMode>,

    /// Whether the cursor field is defined by the source
    #[serde(default)]
    pub source_defined_cursor: bool,

    /// Cursor field path, when source-defined
    #[serde(default)]
    pub default_cursor_field: Option<Vec<String>>,

    /// Primary key as a list of field paths
    #[serde(default)]
    pub source_defined_primary_key: Vec<Vec<String>>,
}

impl Catalog {
    /// Build the catalog from the static stream definitions
    pub fn from_streams(streams: &[StreamDef]) -> Self {
        let streams = streams
            .iter()
            .map(|def| CatalogStream {
                name: def.name.to_string(),
                json_schema: def.json_schema(),
                supported_sync_modes: vec![SyncMode::FullRefresh, SyncMode::Incremental],
                source_defined_cursor: true,
                default_cursor_field: Some(vec![def.replication_key.to_string()]),
                source_defined_primary_key: def
                    .primary_keys
                    .iter()
                    .map(|k| k.split('.').map(ToString::to_string).collect())
                    .collect(),
            })
            .collect();

        Self { streams }
    }

    /// The full catalog for this tap
    pub fn discover() -> Self {
        Self::from_streams(&streams::all_streams())
    }
}

/// A catalog with per-stream selection and sync-mode choices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    /// Selected streams
    pub streams: Vec<ConfiguredStream>,
}

/// One selected stream with its chosen sync mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguredStream {
    /// The catalog entry
    pub stream: CatalogStream,

    /// Chosen sync mode for this run; when omitted, the stream's declared
    /// replication method applies
    #[serde(default)]
    pub sync_mode: Option<SyncMode>,
}

impl ConfiguredCatalog {
    /// Load a configured catalog from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read catalog file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::config(format!("Failed to parse catalog: {e}")))
    }

    /// Select every known stream with its default replication method
    pub fn all_streams() -> Self {
        let streams = streams::all_streams()
            .iter()
            .map(|def| ConfiguredStream {
                stream: Catalog::from_streams(std::slice::from_ref(def))
                    .streams
                    .remove(0),
                sync_mode: Some(def.replication_method),
            })
            .collect();

        Self { streams }
    }

    /// Resolve the selected streams to their definitions with sync modes.
    ///
    /// Unknown stream names are an error rather than a silent skip; an entry
    /// without an explicit sync mode gets the stream's declared replication
    /// method.
    pub fn resolve(&self) -> Result<Vec<(StreamDef, SyncMode)>> {
        self.streams
            .iter()
            .map(|configured| {
                let def = streams::stream_by_name(&configured.stream.name)?;
                let mode = configured.sync_mode.unwrap_or(def.replication_method);
                Ok((def, mode))
            })
            .collect()
    }

    /// Keep only streams whose names are in the filter list
    #[must_use]
    pub fn filter_names(mut self, names: &[&str]) -> Self {
        self.streams
            .retain(|s| names.contains(&s.stream.name.as_str()));
        self
    }
}
