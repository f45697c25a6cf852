//! Error types for the telemetry engine.
//!
//! All engine errors are local and non-fatal to the host computation: the
//! public API either propagates a `PerfError` to the embedding code or
//! degrades to a no-op, but it never panics and never terminates the process.

use std::fmt;
use std::io;

use crate::milestone::MilestoneKind;

/// Errors produced by the telemetry engine.
#[derive(Debug)]
pub enum PerfError {
    /// A configuration value failed validation at build or init time.
    InvalidConfiguration(String),
    /// The thread registry is full; the registration was rejected.
    ThreadCapacity { capacity: usize },
    /// No platform probe could produce a sample; the snapshot stays zeroed.
    ProbeUnavailable(&'static str),
    /// No records in the log buffer match the requested milestone.
    NoSamples(MilestoneKind),
    /// An I/O error while writing to the configured destination.
    Io(io::Error),
}

impl fmt::Display for PerfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerfError::InvalidConfiguration(msg) => {
                write!(f, "invalid configuration: {}", msg)
            }
            PerfError::ThreadCapacity { capacity } => {
                write!(f, "thread registry full ({} slots)", capacity)
            }
            PerfError::ProbeUnavailable(probe) => {
                write!(f, "resource probe unavailable: {}", probe)
            }
            PerfError::NoSamples(kind) => {
                write!(f, "no samples recorded for milestone {}", kind)
            }
            PerfError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for PerfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PerfError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PerfError {
    fn from(err: io::Error) -> Self {
        PerfError::Io(err)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, PerfError>;
