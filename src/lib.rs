// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-keen
//!
//! A tap that extracts event records from the Keen analytics API and emits
//! them as a JSON message stream on stdout, with incremental date-windowed
//! replication so repeated runs fetch only new data.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_keen::catalog::ConfiguredCatalog;
//! use tap_keen::config::TapConfig;
//! use tap_keen::engine::{Message, SyncEngine};
//! use tap_keen::state::StateManager;
//! use tap_keen::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let state = StateManager::from_file("state.json")?;
//!
//!     let mut engine = SyncEngine::from_config(config, state);
//!     let mut messages: Vec<Message> = Vec::new();
//!     engine.sync(&ConfiguredCatalog::all_streams(), &mut messages).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CLI Runner                           │
//! │  check → CONNECTION_STATUS    discover → CATALOG            │
//! │  sync → SCHEMA / RECORD / STATE message stream              │
//! └─────────────────────────────┬───────────────────────────────┘
//! ┌─────────────────────────────┴───────────────────────────────┐
//! │                        Sync Engine                          │
//! │  per stream: windows → fetch+paginate → post-process →      │
//! │  emit records → commit state                                │
//! └────────┬───────────┬───────────────┬───────────┬────────────┘
//! │ Window │   HTTP    │   Paginate    │  Extract  │   State    │
//! ├────────┼───────────┼───────────────┼───────────┼────────────┤
//! │ hourly │ GET       │ next_page     │ JSONPath  │ cursor per │
//! │ slices │ Retry     │ token         │ records   │ stream,    │
//! │        │ Rate limit│               │           │ atomic file│
//! └────────┴───────────┴───────────────┴───────────┴────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// Date-window generation for incremental extraction
pub mod window;

/// HTTP client with retry and rate limiting
pub mod http;

/// Token pagination
pub mod pagination;

/// Record extraction from response bodies
pub mod extract;

/// Stream definitions and post-processing
pub mod streams;

/// Catalog and stream selection
pub mod catalog;

/// State management and checkpointing
pub mod state;

/// Main execution engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
