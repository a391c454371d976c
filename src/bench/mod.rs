//! Benchmark engine module
//!
//! Contains suite construction, the measurement engine, notification
//! normalization, and the sequential orchestrator.

pub mod engine;
pub mod orchestrator;
pub(crate) mod runner;
pub mod suite;

// Re-export commonly used types
pub use orchestrator::{run_batch, run_batch_with, run_live, run_live_with};
pub use suite::{Benchmark, CompletionSignal, Suite, SuiteBuilder, Workload};
