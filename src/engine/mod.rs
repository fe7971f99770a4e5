//! Execution engine module
//!
//! The per-stream sync loop: resolve the starting cursor from state or
//! config, split the range into date windows, run one fetch-and-paginate
//! cycle per window, and commit state at each window boundary.
//!
//! Ordering guarantee: every record of a window is written to the sink
//! before that window's end is committed and its STATE message emitted, so
//! a crash replays at most one window.

mod types;

pub use types::{JsonLinesSink, Message, MessageSink, SyncStats};

use crate::catalog::ConfiguredCatalog;
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::extract::RecordExtractor;
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::pagination::{NextPage, PaginationState, Paginator, TokenPaginator};
use crate::state::StateManager;
use crate::streams::StreamDef;
use crate::types::SyncMode;
use crate::window::{parse_datetime, DateWindow, DateWindows};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, error, info};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// Tap configuration
    config: TapConfig,
    /// HTTP client
    client: HttpClient,
    /// State manager
    state: StateManager,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create an engine with an explicit HTTP client (tests use this to
    /// point at a mock server)
    pub fn new(config: TapConfig, client: HttpClient, state: StateManager) -> Self {
        Self {
            config,
            client,
            state,
            stats: SyncStats::default(),
        }
    }

    /// Create an engine whose HTTP client is derived from the tap config
    pub fn from_config(config: TapConfig, state: StateManager) -> Self {
        let client = HttpClient::with_config(HttpClientConfig::from_tap_config(&config));
        Self::new(config, client, state)
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync every stream selected in the catalog
    pub async fn sync(
        &mut self,
        catalog: &ConfiguredCatalog,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        for (stream, sync_mode) in catalog.resolve()? {
            self.sync_stream(&stream, sync_mode, sink).await?;
        }
        Ok(())
    }

    /// Sync a single stream.
    ///
    /// Emits the SCHEMA message, then for each date window one
    /// fetch-and-paginate cycle of RECORD messages followed by a STATE
    /// message carrying the committed cursor.
    pub async fn sync_stream(
        &mut self,
        stream: &StreamDef,
        sync_mode: SyncMode,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let start_time = Instant::now();
        info!(stream = stream.name, ?sync_mode, "Starting sync");

        sink.write(Message::schema(
            stream.name,
            stream.json_schema(),
            stream.primary_keys.iter().map(ToString::to_string).collect(),
        ))?;

        let cursor = self.resolve_cursor(stream, sync_mode).await?;
        // The cutoff is fixed once per stream sync so late windows never
        // chase a moving "now".
        let cutoff = self.config.end_date.unwrap_or_else(Utc::now);

        let windows = DateWindows::new(cursor, cutoff, self.config.max_fetch_interval_hours)?;
        debug!(
            stream = stream.name,
            %cursor,
            %cutoff,
            "Resolved replication range"
        );

        for window in windows {
            self.fetch_window(stream, &window, sink).await?;

            // Records above are downstream; now the window boundary can be
            // committed and announced. Full refresh re-extracts ranges behind
            // the committed cursor, so its commits skip the ordering check.
            let boundary = window.end.to_rfc3339();
            match sync_mode {
                SyncMode::Incremental => self.state.advance(stream.name, &boundary).await?,
                SyncMode::FullRefresh => self.state.overwrite(stream.name, &boundary).await?,
            }
            sink.write(Message::state(self.state.snapshot().await?))?;
            self.stats.add_window();
        }

        self.stats.add_stream();
        self.stats
            .set_duration(start_time.elapsed().as_millis() as u64);

        info!(
            stream = stream.name,
            records = self.stats.records_emitted,
            dropped = self.stats.records_dropped,
            windows = self.stats.windows_completed,
            pages = self.stats.pages_fetched,
            "Completed sync"
        );

        Ok(())
    }

    /// Resolve where replication starts for this run: committed state when
    /// syncing incrementally, the configured start date otherwise.
    async fn resolve_cursor(
        &self,
        stream: &StreamDef,
        sync_mode: SyncMode,
    ) -> Result<DateTime<Utc>> {
        if sync_mode == SyncMode::Incremental {
            if let Some(value) = self.state.replication_value(stream.name).await {
                return parse_datetime(&value).map_err(|_| {
                    Error::state(format!(
                        "stored replication value '{value}' for stream '{}' is not a timestamp",
                        stream.name
                    ))
                });
            }
        }

        self.config.start_date.ok_or_else(|| {
            Error::config(format!(
                "start_date is required when no state exists for stream '{}'",
                stream.name
            ))
        })
    }

    /// One fetch-and-paginate cycle for a window: request pages until the
    /// paginator reports no further token, post-processing and emitting each
    /// record as it is extracted.
    async fn fetch_window(
        &mut self,
        stream: &StreamDef,
        window: &DateWindow,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let extractor = RecordExtractor::new(stream.records_path);
        let paginator = TokenPaginator::new("next_page", stream.token_path);
        let mut pagination_state = PaginationState::new();

        debug!(
            stream = stream.name,
            start = %window.start,
            end = %window.end,
            "Fetching window"
        );

        loop {
            let mut request = RequestConfig::new();
            for (key, value) in stream.url_params(window) {
                request = request.query(key, value);
            }
            for (key, value) in paginator.initial_params(&pagination_state) {
                request = request.query(key, value);
            }

            let response = self.client.get_with_config(stream.path, request).await?;
            let headers = response.headers().clone();
            let body_text = response
                .text()
                .await
                .map_err(|e| Error::decode(format!("Failed to read response body: {e}")))?;
            let body = extractor.decode(&body_text)?;

            let records = extractor.extract(&body)?;
            let record_count = records.len();
            self.stats.add_page();

            for record in records {
                match stream.post_process(record) {
                    Ok(processed) => {
                        sink.write(Message::record(stream.name, processed))?;
                        self.stats.add_records(1);
                    }
                    Err(e) => {
                        // Dropped, never silently: surfaced on the message
                        // stream and in the logs, then the sync continues.
                        error!(stream = stream.name, "Dropping record: {e}");
                        sink.write(Message::error(format!("Dropping record: {e}")))?;
                        self.stats.add_dropped();
                    }
                }
            }

            let next_page = paginator.process_response(
                &body,
                &headers,
                record_count,
                &mut pagination_state,
            );

            if let NextPage::Done = next_page {
                break;
            }
        }

        Ok(())
    }
}
