//! Engine configuration.
//!
//! A [`Config`] is built once (directly or through [`ConfigBuilder`]) and
//! handed to [`crate::PerfContext::with_config`]. The enable flag, the
//! granularity and the output settings can additionally be mutated on a live
//! context; the capacity fields are fixed at init.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::{PerfError, Result};

/// Default log buffer capacity.
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;
/// Default thread registry capacity.
pub const DEFAULT_MAX_THREADS: usize = 256;
/// Default byte cap for labels and context strings.
pub const DEFAULT_MAX_LABEL_LEN: usize = 64;

/// Monitoring verbosity. Each level is a superset of the previous one.
///
/// Granularity is advisory: callers gate expensive instrumentation behind
/// [`crate::PerfContext::granularity`]; the engine itself only stores the
/// level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Granularity {
    /// Only major milestones.
    Coarse,
    /// Function-level tracking.
    #[default]
    Medium,
    /// Loop and operation level.
    Fine,
    /// Extremely detailed tracking.
    Debug,
}

impl FromStr for Granularity {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "coarse" => Ok(Granularity::Coarse),
            "medium" => Ok(Granularity::Medium),
            "fine" => Ok(Granularity::Fine),
            "debug" => Ok(Granularity::Debug),
            other => Err(PerfError::InvalidConfiguration(format!(
                "unknown granularity '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Coarse => "coarse",
            Granularity::Medium => "medium",
            Granularity::Fine => "fine",
            Granularity::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Minimum level for internal diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Serialization format for flushed records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    #[default]
    Human,
    Csv,
    Json,
    Tsv,
}

impl FromStr for OutputFormat {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "human" => Ok(OutputFormat::Human),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "tsv" => Ok(OutputFormat::Tsv),
            other => Err(PerfError::InvalidConfiguration(format!(
                "unknown output format '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Human => "human",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Tsv => "tsv",
        };
        f.write_str(name)
    }
}

/// Where flushed records are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Destination {
    #[default]
    Stderr,
    Stdout,
    File(PathBuf),
}

/// Full engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub enabled: bool,
    pub granularity: Granularity,
    pub log_level: LogLevel,
    pub output_format: OutputFormat,
    pub destination: Destination,
    /// Flush the whole buffer to the destination after every append.
    pub flush_immediately: bool,
    pub track_memory: bool,
    pub track_cpu: bool,
    pub track_threads: bool,
    /// Reserved for periodic background sampling; not scheduled by the core.
    pub sampling_interval: Duration,
    pub log_capacity: usize,
    pub max_threads: usize,
    pub max_label_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            enabled: true,
            granularity: Granularity::Medium,
            log_level: LogLevel::Info,
            output_format: OutputFormat::Human,
            destination: Destination::Stderr,
            flush_immediately: false,
            track_memory: true,
            track_cpu: true,
            track_threads: true,
            sampling_interval: Duration::from_micros(100_000),
            log_capacity: DEFAULT_LOG_CAPACITY,
            max_threads: DEFAULT_MAX_THREADS,
            max_label_len: DEFAULT_MAX_LABEL_LEN,
        }
    }
}

impl Config {
    /// Start building a configuration from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the capacity fields. Called by the builder and by context init.
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(PerfError::InvalidConfiguration(
                "log capacity must be at least 1".to_string(),
            ));
        }
        if self.max_threads == 0 {
            return Err(PerfError::InvalidConfiguration(
                "thread capacity must be at least 1".to_string(),
            ));
        }
        if self.max_label_len == 0 {
            return Err(PerfError::InvalidConfiguration(
                "label length cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.config.granularity = granularity;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.destination = Destination::File(path.into());
        self
    }

    pub fn destination(mut self, destination: Destination) -> Self {
        self.config.destination = destination;
        self
    }

    pub fn flush_immediately(mut self, flush: bool) -> Self {
        self.config.flush_immediately = flush;
        self
    }

    pub fn track_memory(mut self, track: bool) -> Self {
        self.config.track_memory = track;
        self
    }

    pub fn track_cpu(mut self, track: bool) -> Self {
        self.config.track_cpu = track;
        self
    }

    pub fn track_threads(mut self, track: bool) -> Self {
        self.config.track_threads = track;
        self
    }

    pub fn sampling_interval(mut self, interval: Duration) -> Self {
        self.config.sampling_interval = interval;
        self
    }

    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.config.log_capacity = capacity;
        self
    }

    pub fn max_threads(mut self, capacity: usize) -> Self {
        self.config.max_threads = capacity;
        self
    }

    pub fn max_label_len(mut self, len: usize) -> Self {
        self.config.max_label_len = len;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
