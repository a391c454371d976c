//! Benchmark items and suite construction
//!
//! Contains the named units of work, the completion signal for
//! deferred-mode workloads, and the builder that assembles an ordered
//! suite around shared timing configuration.

use std::fmt;

use tokio::sync::oneshot;

use crate::config::SuiteConfig;
use crate::{Error, Result};

/// Handle through which a deferred workload marks one timed iteration as
/// finished. Consuming it is the only way to resolve the iteration;
/// dropping it unresolved fails the benchmark.
#[derive(Debug)]
pub struct CompletionSignal {
    tx: oneshot::Sender<()>,
}

impl CompletionSignal {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Mark the timed operation as complete.
    pub fn resolve(self) {
        let _ = self.tx.send(());
    }
}

/// The measurable body of a benchmark item
pub enum Workload {
    /// Completion is the function's synchronous return
    Sync(Box<dyn FnMut() + Send>),
    /// Completion is an explicit signal, possibly after asynchronous work
    Deferred(Box<dyn FnMut(CompletionSignal) + Send>),
}

impl fmt::Debug for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workload::Sync(_) => f.write_str("Workload::Sync"),
            Workload::Deferred(_) => f.write_str("Workload::Deferred"),
        }
    }
}

/// A named unit of work whose throughput is measured
#[derive(Debug)]
pub struct Benchmark {
    name: String,
    workload: Workload,
}

impl Benchmark {
    /// Create a benchmark whose iteration ends on synchronous return
    pub fn new(name: impl Into<String>, workload: impl FnMut() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            workload: Workload::Sync(Box::new(workload)),
        }
    }

    /// Create a benchmark whose iteration ends when the given signal is
    /// resolved, allowing asynchronous tails to be part of the measurement
    pub fn deferred(
        name: impl Into<String>,
        workload: impl FnMut(CompletionSignal) + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            workload: Workload::Deferred(Box::new(workload)),
        }
    }

    /// Name of the benchmark
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, Workload) {
        (self.name, self.workload)
    }

    /// Convert a synchronous workload into deferred form: the signal
    /// resolves immediately after the wrapped function returns.
    fn into_deferred(self) -> Self {
        match self.workload {
            Workload::Sync(mut f) => Self {
                name: self.name,
                workload: Workload::Deferred(Box::new(move |signal: CompletionSignal| {
                    f();
                    signal.resolve();
                })),
            },
            Workload::Deferred(_) => self,
        }
    }
}

/// An ordered collection of benchmark items sharing timing configuration.
/// The item list is fixed once built.
#[derive(Debug)]
pub struct Suite {
    name: String,
    config: SuiteConfig,
    items: Vec<Benchmark>,
}

impl Suite {
    /// Start building a suite with the given name
    pub fn builder(name: impl Into<String>) -> SuiteBuilder {
        SuiteBuilder::new(name)
    }

    /// Name of the suite
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timing configuration shared by every item
    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Number of benchmark items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the suite holds no items (never true for built suites)
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item names in registration order
    pub fn item_names(&self) -> Vec<String> {
        self.items.iter().map(|b| b.name.clone()).collect()
    }

    pub(crate) fn into_parts(self) -> (String, SuiteConfig, Vec<Benchmark>) {
        (self.name, self.config, self.items)
    }
}

/// Builder assembling an ordered suite of benchmark items.
///
/// Item names are not required to be unique; duplicates are accepted and
/// simply produce duplicate-named events.
#[derive(Debug)]
pub struct SuiteBuilder {
    name: String,
    config: SuiteConfig,
    items: Vec<Benchmark>,
}

impl SuiteBuilder {
    /// Create a builder with the default timing configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: SuiteConfig::default(),
            items: Vec::new(),
        }
    }

    /// Replace the timing configuration
    pub fn config(mut self, config: SuiteConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a synchronous benchmark
    pub fn bench(
        mut self,
        name: impl Into<String>,
        workload: impl FnMut() + Send + 'static,
    ) -> Self {
        self.items.push(Benchmark::new(name, workload));
        self
    }

    /// Append a deferred-completion benchmark
    pub fn bench_deferred(
        mut self,
        name: impl Into<String>,
        workload: impl FnMut(CompletionSignal) + Send + 'static,
    ) -> Self {
        self.items.push(Benchmark::deferred(name, workload));
        self
    }

    /// Append an already-constructed benchmark
    pub fn add(mut self, item: Benchmark) -> Self {
        self.items.push(item);
        self
    }

    /// Finish the suite. Fails when the item list is empty or the timing
    /// configuration is invalid. With `deferred` set in the configuration,
    /// synchronous workloads are wrapped so completion becomes an explicit
    /// signal resolved after the wrapped function returns.
    pub fn build(self) -> Result<Suite> {
        if self.items.is_empty() {
            return Err(Error::Suite(format!(
                "Suite '{}' has no benchmark items",
                self.name
            )));
        }

        self.config.validate()?;

        let items = if self.config.deferred {
            self.items.into_iter().map(Benchmark::into_deferred).collect()
        } else {
            self.items
        };

        Ok(Suite {
            name: self.name,
            config: self.config,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_builder_preserves_registration_order() {
        let suite = Suite::builder("ordering")
            .bench("a", || {})
            .bench("b", || {})
            .bench("c", || {})
            .build()
            .unwrap();

        assert_eq!(suite.name(), "ordering");
        assert_eq!(suite.len(), 3);
        assert_eq!(suite.item_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_suite_is_rejected() {
        let result = Suite::builder("empty").build();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no benchmark items"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Suite::builder("bad-config")
            .config(SuiteConfig::default().with_max_time(Duration::ZERO))
            .bench("noop", || {})
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_names_are_accepted() {
        let suite = Suite::builder("dupes")
            .bench("same", || {})
            .bench("same", || {})
            .build()
            .unwrap();

        assert_eq!(suite.item_names(), vec!["same", "same"]);
    }

    #[test]
    fn test_deferred_config_wraps_sync_workloads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_inner = calls.clone();

        let suite = Suite::builder("wrapped")
            .config(SuiteConfig::default().with_deferred(true))
            .bench("sync", move || {
                calls_inner.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let (_, _, mut items) = suite.into_parts();
        let (name, workload) = items.remove(0).into_parts();
        assert_eq!(name, "sync");

        match workload {
            Workload::Deferred(mut f) => {
                let (signal, mut rx) = CompletionSignal::channel();
                f(signal);
                assert_eq!(calls.load(Ordering::SeqCst), 1);
                assert!(matches!(rx.try_recv(), Ok(())));
            }
            Workload::Sync(_) => panic!("sync workload was not wrapped"),
        }
    }

    #[test]
    fn test_deferred_workloads_stay_deferred() {
        let suite = Suite::builder("native-deferred")
            .bench_deferred("signal", |signal| signal.resolve())
            .build()
            .unwrap();

        let (_, _, mut items) = suite.into_parts();
        let (_, workload) = items.remove(0).into_parts();
        assert!(matches!(workload, Workload::Deferred(_)));
    }

    #[test]
    fn test_dropped_signal_is_observable() {
        let (signal, mut rx) = CompletionSignal::channel();
        drop(signal);
        assert!(rx.try_recv().is_err());
    }
}
