//! Sequential suite orchestration and delivery sinks
//!
//! Drives an ordered list of suites one at a time, so no two suites'
//! timing windows ever overlap, and delivers the normalized event stream
//! either collected (batch) or broadcast on the global bus (live).

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::bench::engine::{self, NOTIFY_BUFFER};
use crate::bench::runner::relay_suite;
use crate::bench::suite::Suite;
use crate::bus;
use crate::models::event::{Event, EventEnvelope};
use crate::{Error, Result};

/// Capacity of the event stream between orchestrator and sink
const EVENT_BUFFER: usize = 256;

/// Drive `suites` in order, pushing every event into `events`.
///
/// Advancing past a suite requires its `Complete`; failures inside a
/// suite are forwarded as they arrive and never stop the run. The token
/// is consulted before each suite starts, never mid-suite (the engine has
/// no abort hook), and a cancelled run still ends with `Finished`.
async fn drive(
    suites: Vec<Suite>,
    events: mpsc::Sender<Event>,
    token: CancellationToken,
) -> Result<()> {
    for suite in suites {
        if token.is_cancelled() {
            info!("run cancelled; skipping remaining suites");
            break;
        }

        let suite_name = suite.name().to_string();
        let item_names = suite.item_names();
        info!(suite = %suite_name, items = item_names.len(), "suite starting");

        let (notify_tx, notify_rx) = mpsc::channel(NOTIFY_BUFFER);
        let producer = tokio::spawn(engine::run_suite(suite, notify_tx));

        let relayed = relay_suite(suite_name.clone(), item_names, notify_rx, &events).await;

        if let Err(join_error) = producer.await {
            return Err(Error::Engine(format!(
                "engine task for suite '{}' failed: {}",
                suite_name, join_error
            )));
        }
        relayed?;
    }

    events
        .send(Event::Finished)
        .await
        .map_err(|_| Error::Engine("event receiver dropped mid-run".to_string()))?;

    Ok(())
}

/// Run suites sequentially, collecting every event in arrival order.
///
/// Resolves with the complete sequence, `Finished` last, once the run is
/// done. A failing benchmark shows up as a `BenchError` element in the
/// sequence, never as an `Err` here; errors are reserved for engine-fatal
/// conditions.
pub async fn run_batch(suites: Vec<Suite>) -> Result<Vec<Event>> {
    run_batch_with(suites, CancellationToken::new()).await
}

/// [`run_batch`] with an external cancellation token, checked before each
/// suite starts.
pub async fn run_batch_with(suites: Vec<Suite>, token: CancellationToken) -> Result<Vec<Event>> {
    let run = Uuid::new_v4();
    info!(%run, suites = suites.len(), "batch run starting");

    let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
    let driver = tokio::spawn(drive(suites, events_tx, token));

    let mut events = Vec::new();
    while let Some(event) = events_rx.recv().await {
        events.push(event);
    }

    match driver.await {
        Ok(Ok(())) => {
            info!(%run, events = events.len(), "batch run finished");
            Ok(events)
        }
        Ok(Err(e)) => Err(e),
        Err(join_error) => Err(Error::Engine(format!(
            "orchestrator task failed: {}",
            join_error
        ))),
    }
}

/// Begin broadcasting suites on the global bus and return the run id
/// immediately.
///
/// The spawned run holds until a subscription exists on the bus, so a
/// caller that subscribes right after this returns cannot miss the first
/// events. Every event is wrapped in a versioned envelope tagged with the
/// returned run id; completion is observed through the `Finished`
/// envelope. Must be called from within a Tokio runtime.
pub fn run_live(suites: Vec<Suite>) -> Uuid {
    run_live_with(suites, CancellationToken::new())
}

/// [`run_live`] with an external cancellation token, checked before each
/// suite starts.
pub fn run_live_with(suites: Vec<Suite>, token: CancellationToken) -> Uuid {
    let run = Uuid::new_v4();
    info!(%run, suites = suites.len(), "live run starting");

    tokio::spawn(async move {
        tokio::select! {
            _ = bus::global().ready() => {}
            _ = token.cancelled() => {
                info!(%run, "run cancelled before any subscriber attached");
            }
        }

        let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
        let driver = tokio::spawn(drive(suites, events_tx, token));

        while let Some(event) = events_rx.recv().await {
            bus::global().publish(EventEnvelope::new(run, event));
        }

        match driver.await {
            Ok(Ok(())) => info!(%run, "live run finished"),
            Ok(Err(e)) => error!(%run, error = %e, "live run failed"),
            Err(join_error) => {
                error!(%run, error = %join_error, "orchestrator task failed")
            }
        }
    });

    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use std::time::Duration;

    fn quick_config() -> SuiteConfig {
        SuiteConfig::default()
            .with_max_time(Duration::from_millis(15))
            .with_warmup_time(Duration::from_millis(2))
            .with_sample_time(Duration::from_millis(5))
            .with_min_samples(2)
            .with_cycle_delay(Duration::from_millis(1))
            .with_timeout(Duration::from_secs(1))
    }

    fn quick_suite(name: &str, bench_name: &str) -> Suite {
        Suite::builder(name)
            .config(quick_config())
            .bench(bench_name, || {
                std::hint::black_box(0u64);
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_run_emits_only_finished() {
        let events = run_batch(Vec::new()).await.unwrap();
        assert_eq!(events, vec![Event::Finished]);
    }

    #[tokio::test]
    async fn test_precancelled_run_skips_all_suites() {
        let token = CancellationToken::new();
        token.cancel();

        let events = run_batch_with(vec![quick_suite("skipped", "noop")], token)
            .await
            .unwrap();
        assert_eq!(events, vec![Event::Finished]);
    }

    #[tokio::test]
    async fn test_batch_run_ends_with_finished() {
        let events = run_batch(vec![quick_suite("single", "noop")]).await.unwrap();

        assert_eq!(events.last(), Some(&Event::Finished));
        assert_eq!(
            events.iter().filter(|e| **e == Event::Finished).count(),
            1
        );
    }
}
