//! Utility functions module
//!
//! Contains helper functions for throughput and timing formatting.

pub mod units;

// Re-export commonly used functions
pub use units::{format_count, format_duration, format_hz, format_period};
