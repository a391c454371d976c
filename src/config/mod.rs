//! Configuration management module
//!
//! Handles loading, saving, and validation of suite timing configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result, APP_NAME, CONFIG_FILE};

/// Timing configuration shared by every item in a suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Measurement budget per benchmark, excluding calibration
    #[serde(with = "humantime_serde")]
    pub max_time: Duration,
    /// Calibration budget per benchmark, spent estimating iteration cost
    #[serde(with = "humantime_serde")]
    pub warmup_time: Duration,
    /// Target duration of one timed sample batch
    #[serde(with = "humantime_serde")]
    pub sample_time: Duration,
    /// Minimum number of samples per benchmark, regardless of budget
    pub min_samples: usize,
    /// Pause between sample batches, yielding the scheduler
    #[serde(with = "humantime_serde")]
    pub cycle_delay: Duration,
    /// How long a deferred iteration may wait for its completion signal
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Wrap synchronous workloads so completion is an explicit signal
    pub deferred: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            max_time: Duration::from_secs(5),
            warmup_time: Duration::from_millis(100),
            sample_time: Duration::from_millis(50),
            min_samples: 5,
            cycle_delay: Duration::from_millis(5),
            timeout: Duration::from_secs(60),
            deferred: false,
        }
    }
}

impl SuiteConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with tight budgets, suitable for smoke runs
    /// where statistical quality matters less than turnaround.
    pub fn quick() -> Self {
        Self {
            max_time: Duration::from_millis(500),
            warmup_time: Duration::from_millis(20),
            sample_time: Duration::from_millis(10),
            min_samples: 3,
            cycle_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(10),
            deferred: false,
        }
    }

    /// Set the measurement budget per benchmark
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    /// Set the calibration budget per benchmark
    pub fn with_warmup_time(mut self, warmup_time: Duration) -> Self {
        self.warmup_time = warmup_time;
        self
    }

    /// Set the target duration of one sample batch
    pub fn with_sample_time(mut self, sample_time: Duration) -> Self {
        self.sample_time = sample_time;
        self
    }

    /// Set the minimum number of samples per benchmark
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Set the pause between sample batches
    pub fn with_cycle_delay(mut self, cycle_delay: Duration) -> Self {
        self.cycle_delay = cycle_delay;
        self
    }

    /// Set the deferred-completion timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether synchronous workloads are wrapped in deferred mode
    pub fn with_deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        const MAX_TIME_LIMIT: Duration = Duration::from_secs(3600); // 1 hour
        const MAX_CYCLE_DELAY: Duration = Duration::from_secs(1);
        const MAX_SAMPLES: usize = 10_000;

        if self.max_time.is_zero() {
            return Err(Error::Config(
                "Measurement time must be greater than 0".to_string(),
            ));
        }

        if self.max_time > MAX_TIME_LIMIT {
            return Err(Error::Config(format!(
                "Measurement time too long: {}s (max: {}s)",
                self.max_time.as_secs(),
                MAX_TIME_LIMIT.as_secs()
            )));
        }

        if self.warmup_time.is_zero() {
            return Err(Error::Config(
                "Warmup time must be greater than 0".to_string(),
            ));
        }

        if self.sample_time.is_zero() {
            return Err(Error::Config(
                "Sample time must be greater than 0".to_string(),
            ));
        }

        if self.sample_time > self.max_time {
            return Err(Error::Config(format!(
                "Sample time {}ms exceeds the measurement budget {}ms",
                self.sample_time.as_millis(),
                self.max_time.as_millis()
            )));
        }

        if self.min_samples == 0 {
            return Err(Error::Config(
                "Minimum sample count must be greater than 0".to_string(),
            ));
        }

        if self.min_samples > MAX_SAMPLES {
            return Err(Error::Config(format!(
                "Too many samples requested: {} (max: {})",
                self.min_samples, MAX_SAMPLES
            )));
        }

        if self.cycle_delay > MAX_CYCLE_DELAY {
            return Err(Error::Config(format!(
                "Cycle delay too long: {}ms (max: {}ms)",
                self.cycle_delay.as_millis(),
                MAX_CYCLE_DELAY.as_millis()
            )));
        }

        if self.timeout < self.max_time {
            return Err(Error::Config(format!(
                "Deferred timeout {}s is shorter than the measurement budget {}s",
                self.timeout.as_secs(),
                self.max_time.as_secs()
            )));
        }

        Ok(())
    }

    /// Load configuration from the standard config file location.
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// when no file is present and validating whatever is read.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    /// Get the standard configuration file path,
    /// `$CONFIG_HOME/benchrelay/benchrelay.toml`
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Unable to determine config directory".to_string()))?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

// Durations appear in the TOML as humantime strings ("5s", "50ms")
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
