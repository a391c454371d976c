//! Measurement sample records
//!
//! Contains the per-benchmark cycle record produced by the measurement
//! engine, including the throughput statistics derived from timed samples.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Two-sided Student-t critical values at 95% confidence, keyed by degrees
/// of freedom. Larger sample counts fall back to the normal approximation.
const T_TABLE: &[f64] = &[
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.160,
    2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064, 2.060, 2.056,
    2.052, 2.048, 2.045, 2.042,
];

const T_INFINITY: f64 = 1.96;

fn t_critical(degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 {
        return T_INFINITY;
    }
    T_TABLE
        .get(degrees_of_freedom - 1)
        .copied()
        .unwrap_or(T_INFINITY)
}

/// Statistics for one completed measurement pass over a single benchmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Name of the measured benchmark
    pub benchmark: String,
    /// Operations per second, the inverse of the mean iteration period
    pub hz: f64,
    /// Relative margin of error as a percentage of the mean
    pub rme: f64,
    /// Number of timed samples collected
    pub samples: usize,
    /// Mean period of a single iteration
    #[serde(with = "duration_serde")]
    pub mean_period: Duration,
    /// Total iterations executed across all samples
    pub iterations: u64,
    /// Wall-clock time spent sampling, excluding calibration
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
}

impl CycleRecord {
    /// Derive a cycle record from per-iteration period samples.
    ///
    /// Each sample is the mean iteration period of one timed batch. The
    /// margin of error uses the two-sided Student-t critical value at 95%
    /// confidence for the sample count, matching the classic benchmark
    /// statistic: `rme = t * (sd / sqrt(n)) / mean * 100`.
    pub fn from_samples(
        benchmark: impl Into<String>,
        periods: &[Duration],
        iterations_per_sample: u64,
        elapsed: Duration,
    ) -> Self {
        let benchmark = benchmark.into();
        let n = periods.len();

        if n == 0 {
            return Self {
                benchmark,
                hz: 0.0,
                rme: 0.0,
                samples: 0,
                mean_period: Duration::ZERO,
                iterations: 0,
                elapsed,
            };
        }

        let secs: Vec<f64> = periods.iter().map(Duration::as_secs_f64).collect();
        let mean = secs.iter().sum::<f64>() / n as f64;

        let rme = if n > 1 && mean > 0.0 {
            let variance = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            let sem = variance.sqrt() / (n as f64).sqrt();
            let moe = sem * t_critical(n - 1);
            (moe / mean) * 100.0
        } else {
            0.0
        };

        let hz = if mean > 0.0 { 1.0 / mean } else { 0.0 };

        Self {
            benchmark,
            hz,
            rme,
            samples: n,
            mean_period: Duration::from_secs_f64(mean),
            iterations: iterations_per_sample.saturating_mul(n as u64),
            elapsed,
        }
    }
}

// Custom serde module for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_nanos().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u128::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}
