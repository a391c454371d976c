//! Suite runner and event normalization
//!
//! Consumes one suite's lifecycle notifications and translates them into
//! the closed event vocabulary, attributing failures to a benchmark name
//! before they leave the orchestrator.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bench::engine::SuiteNotification;
use crate::models::event::{Event, UNKNOWN_BENCHMARK};
use crate::{Error, Result};

/// Per-item failure table backing attribution.
///
/// The engine names the failing item directly whenever it can. When a
/// failure arrives without identity, the registered item names are scanned
/// in reverse registration order for the most recently recorded failure;
/// if none exists the name degrades to the `"<unknown>"` sentinel. The
/// scan is a documented heuristic, not a guarantee: it holds because items
/// execute in registration order, so the last marked item is the most
/// recent one to fail.
#[derive(Debug)]
pub(crate) struct Attribution {
    names: Vec<String>,
    failed: Vec<bool>,
}

impl Attribution {
    pub(crate) fn new(names: Vec<String>) -> Self {
        let failed = vec![false; names.len()];
        Self { names, failed }
    }

    /// Record a named failure. With duplicate names, the earliest
    /// unmarked occurrence is taken, approximating execution order.
    fn record(&mut self, benchmark: &str) {
        let slot = self
            .names
            .iter()
            .zip(self.failed.iter())
            .position(|(name, failed)| name == benchmark && !failed);
        if let Some(index) = slot {
            self.failed[index] = true;
        }
    }

    fn most_recent_failure(&self) -> Option<&str> {
        self.names
            .iter()
            .zip(self.failed.iter())
            .rev()
            .find(|(_, failed)| **failed)
            .map(|(name, _)| name.as_str())
    }

    /// Resolve the benchmark name for a failure notification.
    fn resolve(&mut self, benchmark: Option<String>) -> String {
        if let Some(name) = benchmark {
            self.record(&name);
            return name;
        }

        match self.most_recent_failure() {
            Some(name) => name.to_string(),
            None => {
                warn!("failure could not be attributed to a benchmark");
                UNKNOWN_BENCHMARK.to_string()
            }
        }
    }
}

/// Map one notification onto its event.
fn normalize(
    suite: &str,
    notification: SuiteNotification,
    attribution: &mut Attribution,
) -> Event {
    match notification {
        SuiteNotification::Started { platform } => Event::Start {
            suite: suite.to_string(),
            platform,
        },
        SuiteNotification::CycleFinished(record) => Event::Cycle {
            suite: suite.to_string(),
            benchmark: record.benchmark,
            hz: record.hz,
            rme: record.rme,
            samples: record.samples,
        },
        SuiteNotification::ItemFailed { benchmark, message } => Event::BenchError {
            suite: suite.to_string(),
            benchmark: attribution.resolve(benchmark),
            message,
        },
        SuiteNotification::Completed => Event::Complete {
            suite: suite.to_string(),
        },
    }
}

/// Drive one suite's notification stream into `events`, in arrival order.
///
/// Returns once the suite's `Complete` has been forwarded. A notification
/// channel that closes earlier means the engine producer died, which is
/// not representable as an event and surfaces as an error instead.
pub(crate) async fn relay_suite(
    suite_name: String,
    item_names: Vec<String>,
    mut notifications: mpsc::Receiver<SuiteNotification>,
    events: &mpsc::Sender<Event>,
) -> Result<()> {
    let mut attribution = Attribution::new(item_names);

    while let Some(notification) = notifications.recv().await {
        let completed = matches!(notification, SuiteNotification::Completed);
        let event = normalize(&suite_name, notification, &mut attribution);
        debug!(kind = event.kind(), event = %event, "event");

        events
            .send(event)
            .await
            .map_err(|_| Error::Engine("event receiver dropped mid-run".to_string()))?;

        if completed {
            return Ok(());
        }
    }

    Err(Error::Engine(format!(
        "suite '{}' ended without completing",
        suite_name
    )))
}
