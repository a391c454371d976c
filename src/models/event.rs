//! Benchmark event data models
//!
//! Contains the closed event vocabulary emitted by orchestrated runs and
//! the versioned envelope used when events cross the live broadcast bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::util::units::format_hz;

/// Schema version stamped on every broadcast envelope
pub const EVENT_SCHEMA_VERSION: u32 = 1;

/// Sentinel benchmark name used when a failure cannot be attributed
pub const UNKNOWN_BENCHMARK: &str = "<unknown>";

/// One lifecycle event from an orchestrated benchmark run.
///
/// Events are immutable value records; the only relationship between them
/// is their order of emission. Within a suite, `Cycle` events appear in
/// item registration order and `Complete` follows all of them. `Finished`
/// is the terminal event of a run and appears exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A suite began executing
    Start {
        /// Name of the suite
        suite: String,
        /// Host description, e.g. "linux x86_64"
        platform: String,
    },
    /// One benchmark finished a full measurement pass
    Cycle {
        /// Name of the suite the benchmark belongs to
        suite: String,
        /// Name of the measured benchmark
        benchmark: String,
        /// Operations per second (inverse of the mean iteration period)
        hz: f64,
        /// Relative margin of error, in percent
        rme: f64,
        /// Number of timed samples behind the statistics
        samples: usize,
    },
    /// A suite finished; every item ran, successfully or not
    Complete {
        /// Name of the suite
        suite: String,
    },
    /// A benchmark failed during measurement; the suite keeps running
    BenchError {
        /// Name of the suite
        suite: String,
        /// Best-effort attributed benchmark name, `"<unknown>"` if
        /// attribution failed
        benchmark: String,
        /// Failure description from the engine
        message: String,
    },
    /// The orchestrated run is over; no further events will follow
    Finished,
}

impl Event {
    /// Suite this event belongs to, if any (`Finished` has none).
    pub fn suite(&self) -> Option<&str> {
        match self {
            Event::Start { suite, .. }
            | Event::Cycle { suite, .. }
            | Event::Complete { suite }
            | Event::BenchError { suite, .. } => Some(suite),
            Event::Finished => None,
        }
    }

    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::Cycle { .. } => "cycle",
            Event::Complete { .. } => "complete",
            Event::BenchError { .. } => "error",
            Event::Finished => "finished",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Start { suite, platform } => {
                write!(f, "{}: start on {}", suite, platform)
            }
            Event::Cycle {
                suite,
                benchmark,
                hz,
                rme,
                samples,
            } => write!(
                f,
                "{}: {} x {} ops/sec \u{b1}{:.2}% ({} runs sampled)",
                suite,
                benchmark,
                format_hz(*hz),
                rme,
                samples
            ),
            Event::Complete { suite } => write!(f, "{}: complete", suite),
            Event::BenchError {
                suite,
                benchmark,
                message,
            } => write!(f, "{}: {} failed: {}", suite, benchmark, message),
            Event::Finished => write!(f, "finished"),
        }
    }
}

/// Wire record wrapping one event on the live broadcast bus.
///
/// The run id distinguishes interleaved concurrent runs; the version tag
/// lets long-lived subscribers detect schema drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Envelope schema version, currently [`EVENT_SCHEMA_VERSION`]
    pub version: u32,
    /// Identifier of the orchestrated run that produced the event
    pub run: Uuid,
    /// Broadcast timestamp
    pub at: DateTime<Utc>,
    /// The event payload
    pub event: Event,
}

impl EventEnvelope {
    /// Wrap an event for broadcast under the current schema version.
    pub fn new(run: Uuid, event: Event) -> Self {
        Self {
            version: EVENT_SCHEMA_VERSION,
            run,
            at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_event() -> Event {
        Event::Cycle {
            suite: "alloc".to_string(),
            benchmark: "push".to_string(),
            hz: 1_500.0,
            rme: 0.45,
            samples: 67,
        }
    }

    #[test]
    fn test_event_serialization_tags() {
        let start = Event::Start {
            suite: "s1".to_string(),
            platform: "linux x86_64".to_string(),
        };
        let json = serde_json::to_string(&start).unwrap();
        assert!(json.contains("\"type\":\"Start\""));
        assert!(json.contains("\"suite\":\"s1\""));

        let finished = serde_json::to_string(&Event::Finished).unwrap();
        assert_eq!(finished, "{\"type\":\"Finished\"}");
    }

    #[test]
    fn test_event_round_trip() {
        let events = vec![
            Event::Start {
                suite: "s1".to_string(),
                platform: "linux x86_64".to_string(),
            },
            cycle_event(),
            Event::Complete {
                suite: "s1".to_string(),
            },
            Event::BenchError {
                suite: "s1".to_string(),
                benchmark: UNKNOWN_BENCHMARK.to_string(),
                message: "boom".to_string(),
            },
            Event::Finished,
        ];

        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let back: Event = serde_json::from_str(&json).unwrap();
            assert_eq!(back, event);
        }
    }

    #[test]
    fn test_event_suite_accessor() {
        assert_eq!(cycle_event().suite(), Some("alloc"));
        assert_eq!(Event::Finished.suite(), None);
    }

    #[test]
    fn test_cycle_display_line() {
        assert_eq!(
            cycle_event().to_string(),
            "alloc: push x 1,500 ops/sec \u{b1}0.45% (67 runs sampled)"
        );
    }

    #[test]
    fn test_display_variants() {
        let start = Event::Start {
            suite: "s1".to_string(),
            platform: "linux x86_64".to_string(),
        };
        assert_eq!(start.to_string(), "s1: start on linux x86_64");

        let complete = Event::Complete {
            suite: "s1".to_string(),
        };
        assert_eq!(complete.to_string(), "s1: complete");

        let error = Event::BenchError {
            suite: "s1".to_string(),
            benchmark: "parse".to_string(),
            message: "panicked".to_string(),
        };
        assert_eq!(error.to_string(), "s1: parse failed: panicked");

        assert_eq!(Event::Finished.to_string(), "finished");
    }

    #[test]
    fn test_envelope_carries_version_and_run() {
        let run = Uuid::new_v4();
        let envelope = EventEnvelope::new(run, Event::Finished);

        assert_eq!(envelope.version, EVENT_SCHEMA_VERSION);
        assert_eq!(envelope.run, run);
        assert!(envelope.at <= Utc::now());
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = EventEnvelope::new(Uuid::new_v4(), cycle_event());

        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();

        assert_eq!(back, envelope);
        assert_eq!(back.event.suite(), Some("alloc"));
    }
}
