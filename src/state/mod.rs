//! State management module
//!
//! Handles replication-cursor tracking and persistence between runs.
//! State is flushed to disk after every committed window so a re-run
//! resumes instead of restarting.

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{State, StreamState};

#[cfg(test)]
mod manager_tests;
