//! Suite measurement engine
//!
//! Runs every item of one suite in registration order, producing lifecycle
//! notifications over an async channel: calibration picks an iteration
//! count per timed batch, sampling fills the measurement budget, and the
//! resulting statistics become a cycle record. A failing item is reported
//! and skipped; it never aborts the suite.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time;
use tracing::debug;

use crate::bench::suite::{CompletionSignal, Suite, Workload};
use crate::config::SuiteConfig;
use crate::models::CycleRecord;
use crate::util::units::format_duration;

/// Capacity of the notification channel between engine and runner
pub(crate) const NOTIFY_BUFFER: usize = 64;

/// Lifecycle notification emitted while one suite runs.
///
/// Exactly one `Started` opens the stream and exactly one `Completed`
/// closes it; cycle and failure notifications arrive in item execution
/// order in between.
#[derive(Debug)]
pub enum SuiteNotification {
    /// The suite began executing
    Started {
        /// Host description, e.g. "linux x86_64"
        platform: String,
    },
    /// One item finished a full measurement pass
    CycleFinished(CycleRecord),
    /// One item failed; the suite keeps running
    ItemFailed {
        /// The failing item, when the engine still knows its identity
        benchmark: Option<String>,
        /// Failure description
        message: String,
    },
    /// Every item ran, successfully or not
    Completed,
}

/// Host description reported on suite start
pub fn platform_description() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Run one suite to completion, pushing notifications into `tx`.
///
/// Returns early when the receiver is dropped, since nobody is listening
/// for the remaining notifications.
pub async fn run_suite(suite: Suite, tx: mpsc::Sender<SuiteNotification>) {
    let (name, config, items) = suite.into_parts();

    debug!(suite = %name, items = items.len(), "engine starting suite");

    let started = SuiteNotification::Started {
        platform: platform_description(),
    };
    if tx.send(started).await.is_err() {
        return;
    }

    for item in items {
        let (bench_name, workload) = item.into_parts();

        let notification = match measure(&bench_name, workload, &config).await {
            Ok(record) => SuiteNotification::CycleFinished(record),
            Err(message) => {
                debug!(suite = %name, benchmark = %bench_name, error = %message, "item failed");
                SuiteNotification::ItemFailed {
                    benchmark: Some(bench_name),
                    message,
                }
            }
        };

        if tx.send(notification).await.is_err() {
            return;
        }
    }

    let _ = tx.send(SuiteNotification::Completed).await;
}

async fn measure(
    name: &str,
    workload: Workload,
    config: &SuiteConfig,
) -> std::result::Result<CycleRecord, String> {
    match workload {
        Workload::Sync(f) => measure_sync(name, f, config).await,
        Workload::Deferred(f) => measure_deferred(name, f, config).await,
    }
}

/// Measure a synchronous workload: calibrate an iteration count so one
/// timed batch approximates the configured sample time, then collect
/// batches until the budget and minimum sample count are both satisfied.
async fn measure_sync(
    name: &str,
    mut f: Box<dyn FnMut() + Send>,
    config: &SuiteConfig,
) -> std::result::Result<CycleRecord, String> {
    let calibration_started = Instant::now();
    let mut calibration_iterations: u64 = 0;

    while calibration_started.elapsed() < config.warmup_time {
        run_isolated(&mut f)?;
        calibration_iterations += 1;
    }

    let iterations = iterations_per_sample(
        calibration_started.elapsed(),
        calibration_iterations,
        config.sample_time,
    );
    debug!(benchmark = name, iterations, "calibrated");

    let mut samples: Vec<Duration> = Vec::new();
    let started = Instant::now();

    loop {
        let batch_started = Instant::now();
        for _ in 0..iterations {
            run_isolated(&mut f)?;
        }
        samples.push(mean_period(batch_started.elapsed(), iterations));

        if started.elapsed() >= config.max_time && samples.len() >= config.min_samples {
            break;
        }

        pause(config.cycle_delay).await;
    }

    let elapsed = started.elapsed();
    debug!(benchmark = name, samples = samples.len(), "measurement finished");

    Ok(CycleRecord::from_samples(name, &samples, iterations, elapsed))
}

/// Measure a deferred workload. Identical shape to the synchronous path,
/// but an iteration lasts from invocation until its completion signal
/// resolves, so any asynchronous tail is part of the timing.
async fn measure_deferred(
    name: &str,
    mut f: Box<dyn FnMut(CompletionSignal) + Send>,
    config: &SuiteConfig,
) -> std::result::Result<CycleRecord, String> {
    let calibration_started = Instant::now();
    let mut calibration_iterations: u64 = 0;

    while calibration_started.elapsed() < config.warmup_time {
        run_deferred_iteration(&mut f, config.timeout).await?;
        calibration_iterations += 1;
    }

    let iterations = iterations_per_sample(
        calibration_started.elapsed(),
        calibration_iterations,
        config.sample_time,
    );
    debug!(benchmark = name, iterations, "calibrated");

    let mut samples: Vec<Duration> = Vec::new();
    let started = Instant::now();

    loop {
        let batch_started = Instant::now();
        for _ in 0..iterations {
            run_deferred_iteration(&mut f, config.timeout).await?;
        }
        samples.push(mean_period(batch_started.elapsed(), iterations));

        if started.elapsed() >= config.max_time && samples.len() >= config.min_samples {
            break;
        }

        pause(config.cycle_delay).await;
    }

    let elapsed = started.elapsed();
    debug!(benchmark = name, samples = samples.len(), "measurement finished");

    Ok(CycleRecord::from_samples(name, &samples, iterations, elapsed))
}

/// One deferred iteration: invoke the workload with a fresh signal and
/// wait for it to resolve. A dropped signal or an expired timeout fails
/// the iteration.
async fn run_deferred_iteration(
    f: &mut Box<dyn FnMut(CompletionSignal) + Send>,
    timeout: Duration,
) -> std::result::Result<(), String> {
    let (signal, rx) = CompletionSignal::channel();

    panic::catch_unwind(AssertUnwindSafe(|| f(signal))).map_err(panic_message)?;

    match time::timeout(timeout, rx).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err("completion signal dropped without resolving".to_string()),
        Err(_) => Err(format!(
            "deferred completion timed out after {}",
            format_duration(timeout)
        )),
    }
}

fn run_isolated(f: &mut Box<dyn FnMut() + Send>) -> std::result::Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(|| f())).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "benchmark panicked".to_string()
    }
}

/// Pick how many iterations one timed batch should hold so the batch
/// approximates the target sample time.
fn iterations_per_sample(calibrated: Duration, iterations: u64, sample_time: Duration) -> u64 {
    if iterations == 0 {
        return 1;
    }

    // Floor the period estimate at 1ns so a workload faster than the
    // timer's resolution cannot request an unbounded batch.
    let period = (calibrated.as_secs_f64() / iterations as f64).max(1e-9);
    let per_sample = (sample_time.as_secs_f64() / period).round() as u64;
    per_sample.max(1)
}

fn mean_period(batch_elapsed: Duration, iterations: u64) -> Duration {
    Duration::from_secs_f64(batch_elapsed.as_secs_f64() / iterations.max(1) as f64)
}

async fn pause(cycle_delay: Duration) {
    if cycle_delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        time::sleep(cycle_delay).await;
    }
}
