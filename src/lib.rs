//! phyloperf: embeddable performance telemetry for multi-threaded
//! bioinformatics pipelines.
//!
//! The engine records high-resolution timing, memory, CPU and thread-count
//! metrics for named phases ("milestones") of a host computation such as
//! pairwise distance calculation, clustering, tree construction or sequence
//! alignment. Worker threads register once, then call the milestone and
//! event APIs around their units of work; records land in a bounded,
//! append-only log buffer that the statistics engine and the output
//! formatters consume at shutdown.
//!
//! ```no_run
//! use phyloperf::{MilestoneKind, PerfContext};
//!
//! let perf = PerfContext::new()?;
//!
//! perf.start_milestone(MilestoneKind::FastaParse);
//! // ... parse input ...
//! perf.end_milestone(MilestoneKind::FastaParse);
//!
//! for iteration in 0..10 {
//!     let _scope = perf.scoped_labeled(MilestoneKind::ClusteringIteration, "k-means");
//!     let convergence = 0.5; // ... one clustering pass ...
//!     perf.log_iteration(iteration, convergence);
//! }
//!
//! perf.print_summary();
//! perf.flush()?;
//! # Ok::<(), phyloperf::PerfError>(())
//! ```
//!
//! All entry points are synchronous and non-fatal to the host: probe
//! failures degrade to zeroed fields, a full buffer drops (and counts) new
//! records, and misuse such as an `end` without a matching `start` is a
//! no-op.

pub mod buffer;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod milestone;
pub mod output;
pub mod probes;
pub mod stats;
pub mod threads;
mod tracker;

pub use buffer::LogBuffer;
pub use clock::{diff_ms, diff_ns, Timestamp};
pub use config::{Config, ConfigBuilder, Destination, Granularity, LogLevel, OutputFormat};
pub use context::PerfContext;
pub use error::{PerfError, Result};
pub use metrics::{CpuSnapshot, MemorySnapshot, MetricRecord};
pub use milestone::MilestoneKind;
pub use output::{format_duration, format_memory_size, CSV_HEADER};
pub use probes::{sample_memory, CpuSampler};
pub use stats::{MilestoneRow, MilestoneStatistics, Summary};
pub use threads::{AllocationCounters, ThreadRegistry, ThreadSlot};
pub use tracker::MilestoneGuard;
