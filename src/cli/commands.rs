//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tap-keen: extract event data from the Keen analytics API
#[derive(Parser, Debug)]
#[command(name = "tap-keen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline config JSON
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// State file (JSON), read at start and written after every window
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON (not persisted)
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Configured catalog file (JSON)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test connection to the API with the configured credentials
    Check,

    /// Emit the stream catalog
    Discover,

    /// Run extraction
    Sync {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_discover() {
        let cli = Cli::parse_from(["tap-keen", "discover"]);
        assert!(matches!(cli.command, Commands::Discover));
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_sync_with_options() {
        let cli = Cli::parse_from([
            "tap-keen",
            "--config",
            "config.json",
            "--state",
            "state.json",
            "--catalog",
            "catalog.json",
            "--format",
            "pretty",
            "sync",
            "--streams",
            "video_time_updates",
        ]);

        assert_eq!(cli.config.unwrap().to_str().unwrap(), "config.json");
        assert_eq!(cli.state.unwrap().to_str().unwrap(), "state.json");
        assert_eq!(cli.catalog.unwrap().to_str().unwrap(), "catalog.json");
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(matches!(
            cli.command,
            Commands::Sync { streams: Some(ref s) } if s == "video_time_updates"
        ));
    }

    #[test]
    fn test_parse_check_with_inline_config() {
        let cli = Cli::parse_from([
            "tap-keen",
            "--config-json",
            r#"{"project_id": "p", "read_key": "k"}"#,
            "check",
        ]);
        assert!(matches!(cli.command, Commands::Check));
        assert!(cli.config_json.is_some());
    }
}
