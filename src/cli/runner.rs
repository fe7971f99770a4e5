//! CLI runner - executes commands

use crate::catalog::{Catalog, ConfiguredCatalog};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::TapConfig;
use crate::engine::{JsonLinesSink, Message, MessageSink, SyncEngine};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::state::StateManager;
use crate::streams;
use crate::window::DateWindow;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Discover => self.discover(),
            Commands::Sync { streams } => self.sync(streams.as_deref()).await,
        }
    }

    /// Load tap config; inline JSON takes precedence over the file
    fn load_config(&self) -> Result<TapConfig> {
        if let Some(inline) = &self.cli.config_json {
            return TapConfig::from_json(inline);
        }
        if let Some(path) = &self.cli.config {
            return TapConfig::from_file(path);
        }
        Err(Error::config(
            "Config not specified (use --config <path> or --config-json <json>)",
        ))
    }

    /// Load state; inline JSON takes precedence, a missing file starts empty
    fn load_state(&self) -> Result<StateManager> {
        if let Some(inline) = &self.cli.state_json {
            return StateManager::from_json(inline);
        }
        if let Some(path) = &self.cli.state {
            return StateManager::from_file(path);
        }
        Ok(StateManager::in_memory())
    }

    /// Resolve the configured catalog for a sync run
    fn load_catalog(&self, stream_filter: Option<&str>) -> Result<ConfiguredCatalog> {
        let catalog = if let Some(path) = &self.cli.catalog {
            ConfiguredCatalog::from_file(path)?
        } else {
            ConfiguredCatalog::all_streams()
        };

        let catalog = match stream_filter {
            Some(names) => {
                let names: Vec<&str> = names.split(',').map(str::trim).collect();
                catalog.filter_names(&names)
            }
            None => catalog,
        };

        if catalog.streams.is_empty() {
            return Err(Error::config("No streams selected"));
        }

        Ok(catalog)
    }

    /// `check` — issue one minimal extraction request to verify the
    /// project/key pair works
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;

        info!(project_id = config.project_id, "Checking connection");

        let client = HttpClient::with_config(HttpClientConfig::from_tap_config(&config));
        let stream = streams::video_time_updates();

        // A one-second window keeps the probe cheap
        let now = Utc::now();
        let window = DateWindow {
            start: now - Duration::seconds(1),
            end: now,
        };

        let mut request = RequestConfig::new();
        for (key, value) in stream.url_params(&window) {
            request = request.query(key, value);
        }

        match client.get_with_config(stream.path, request).await {
            Ok(_) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "SUCCEEDED",
                        "message": "Connection successful"
                    }
                }));
                Ok(())
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "FAILED",
                        "message": format!("Connection failed: {e}")
                    }
                }));
                Err(Error::connection_check(e.to_string()))
            }
        }
    }

    /// `discover` — emit the catalog built from the static stream
    /// definitions. Needs no credentials.
    fn discover(&self) -> Result<()> {
        let catalog = Catalog::discover();
        self.output_message(&json!({
            "type": "CATALOG",
            "catalog": catalog,
        }));
        Ok(())
    }

    /// `sync` — run extraction for the selected streams
    async fn sync(&self, stream_filter: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let state = self.load_state()?;
        let catalog = self.load_catalog(stream_filter)?;

        let mut engine = SyncEngine::from_config(config, state);
        let mut sink = StdoutSink {
            format: self.cli.format,
        };

        engine.sync(&catalog, &mut sink).await?;

        let stats = engine.stats();
        info!(
            records = stats.records_emitted,
            dropped = stats.records_dropped,
            windows = stats.windows_completed,
            duration_ms = stats.duration_ms,
            "Sync finished"
        );

        Ok(())
    }

    /// Print one message to stdout in the selected format
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Sink that prints each engine message to stdout
struct StdoutSink {
    format: OutputFormat,
}

impl MessageSink for StdoutSink {
    fn write(&mut self, message: Message) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let stdout = std::io::stdout().lock();
                let mut sink = JsonLinesSink::new(stdout);
                sink.write(message)
            }
            OutputFormat::Pretty => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&message.to_json()).unwrap_or_default()
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn runner(args: &[&str]) -> Runner {
        Runner::new(Cli::parse_from(args))
    }

    #[test]
    fn test_load_config_requires_source() {
        let runner = runner(&["tap-keen", "discover"]);
        assert!(runner.load_config().is_err());
    }

    #[test]
    fn test_load_config_inline() {
        let runner = runner(&[
            "tap-keen",
            "--config-json",
            r#"{"project_id": "p", "read_key": "k"}"#,
            "sync",
        ]);
        let config = runner.load_config().unwrap();
        assert_eq!(config.project_id, "p");
    }

    #[test]
    fn test_inline_config_takes_precedence_over_file() {
        let runner = runner(&[
            "tap-keen",
            "--config",
            "/nonexistent/config.json",
            "--config-json",
            r#"{"project_id": "inline", "read_key": "k"}"#,
            "sync",
        ]);
        // The nonexistent file is never read
        let config = runner.load_config().unwrap();
        assert_eq!(config.project_id, "inline");
    }

    #[test]
    fn test_load_state_defaults_to_in_memory() {
        let runner = runner(&["tap-keen", "sync"]);
        assert!(runner.load_state().unwrap().is_in_memory());
    }

    #[test]
    fn test_load_state_inline() {
        let runner = runner(&[
            "tap-keen",
            "--state-json",
            r#"{"streams": {"video_time_updates": {"replication_key_value": "2022-03-15T06:00:00Z"}}}"#,
            "sync",
        ]);
        let state = runner.load_state().unwrap();
        assert!(state.is_in_memory());
    }

    #[test]
    fn test_load_catalog_filters_streams() {
        let runner = runner(&["tap-keen", "sync"]);

        let catalog = runner.load_catalog(None).unwrap();
        assert_eq!(catalog.streams.len(), 1);

        let catalog = runner.load_catalog(Some("video_time_updates")).unwrap();
        assert_eq!(catalog.streams.len(), 1);

        assert!(runner.load_catalog(Some("unknown_stream")).is_err());
    }
}
