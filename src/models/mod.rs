//! Data models module
//!
//! Contains the event vocabulary, the broadcast envelope, and the
//! measurement records produced by the engine.

pub mod event;
pub mod sample;

// Re-export commonly used types
pub use event::{Event, EventEnvelope, EVENT_SCHEMA_VERSION, UNKNOWN_BENCHMARK};
pub use sample::CycleRecord;
