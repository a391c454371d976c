//! benchrelay - sequential benchmark suites with an ordered event stream
//!
//! Runs registered suites strictly one at a time and normalizes the
//! measurement engine's lifecycle notifications into a closed event
//! vocabulary, delivered either as a collected batch or broadcast live
//! to subscribers on a process-wide bus.

// Public re-exports
pub mod bench;
pub mod bus;
pub mod config;
pub mod models;
pub mod util;

pub use bench::{
    run_batch, run_batch_with, run_live, run_live_with, Benchmark, CompletionSignal, Suite,
    SuiteBuilder, Workload,
};
pub use bus::{subscribe, EventBus, Subscription};
pub use config::SuiteConfig;
pub use models::{CycleRecord, Event, EventEnvelope, EVENT_SCHEMA_VERSION, UNKNOWN_BENCHMARK};

// Common error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration validation or parsing error
    #[error("Configuration error: {0}")]
    Config(String),
    /// Suite construction error
    #[error("Suite error: {0}")]
    Suite(String),
    /// Engine-fatal condition during a run
    #[error("Engine error: {0}")]
    Engine(String),
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Event serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type alias for benchrelay operations
pub type Result<T> = std::result::Result<T, Error>;

// Common types and constants
pub const APP_NAME: &str = "benchrelay";
pub const CONFIG_FILE: &str = "benchrelay.toml";
