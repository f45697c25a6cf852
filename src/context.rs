//! Process-wide telemetry context.
//!
//! A [`PerfContext`] owns the configuration, the log buffer, the thread
//! registry, the allocation counters and the CPU sampler. It is an explicit
//! owned object rather than a global: embedders typically keep one behind an
//! `Arc` and hand clones to their worker threads, and tests create as many
//! independent contexts as they need. Every entry point is synchronous,
//! non-blocking (beyond the underlying OS calls) and non-fatal to the host.

use std::fs::File;
use std::io::{self, BufWriter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::LogBuffer;
use crate::clock::{self, Timestamp};
use crate::config::{Config, Destination, Granularity, OutputFormat};
use crate::error::{PerfError, Result};
use crate::metrics::{clamp_label, CpuSnapshot, MemorySnapshot, MetricRecord};
use crate::milestone::MilestoneKind;
use crate::output;
use crate::probes::{sample_memory, CpuSampler};
use crate::stats::{MilestoneRow, MilestoneStatistics, Summary};
use crate::threads::{AllocationCounters, ThreadRegistry, ThreadSlot};
use crate::tracker::{self, MilestoneGuard};

// Distinguishes coexisting contexts in thread-local state.
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

pub struct PerfContext {
    config: RwLock<Config>,
    // Mirror of config.enabled for the hot path.
    enabled: AtomicBool,
    epoch: u64,
    buffer: RwLock<LogBuffer>,
    registry: ThreadRegistry,
    counters: AllocationCounters,
    cpu_sampler: CpuSampler,
    program_start: RwLock<Timestamp>,
    peak_memory_kb: AtomicU64,
}

impl PerfContext {
    /// Create a context with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Create a context with `config`, allocating the log buffer at the
    /// configured capacity and stamping the program start time.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let epoch = NEXT_EPOCH.fetch_add(1, Ordering::Relaxed);
        let enabled = config.enabled;
        let buffer = LogBuffer::with_capacity(config.log_capacity);
        let registry = ThreadRegistry::new(config.max_threads, epoch);

        Ok(PerfContext {
            config: RwLock::new(config),
            enabled: AtomicBool::new(enabled),
            epoch,
            buffer: RwLock::new(buffer),
            registry,
            counters: AllocationCounters::default(),
            cpu_sampler: CpuSampler::new(),
            program_start: RwLock::new(Timestamp::now()),
            peak_memory_kb: AtomicU64::new(0),
        })
    }

    // ---- configuration -------------------------------------------------

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.read_config().clone()
    }

    /// Replace the live configuration. The buffer and registry capacities
    /// were fixed at init; capacity fields in `config` are ignored.
    pub fn set_config(&self, config: Config) -> Result<()> {
        config.validate()?;
        self.enabled.store(config.enabled, Ordering::Release);
        *self.write_config() = config;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        self.write_config().enabled = enabled;
    }

    pub fn granularity(&self) -> Granularity {
        self.read_config().granularity
    }

    pub fn set_granularity(&self, granularity: Granularity) {
        self.write_config().granularity = granularity;
    }

    pub fn set_output_format(&self, format: OutputFormat) {
        self.write_config().output_format = format;
    }

    pub fn set_output_file(&self, path: impl Into<std::path::PathBuf>) {
        self.write_config().destination = Destination::File(path.into());
    }

    // ---- thread registry -----------------------------------------------

    /// Register the calling worker thread.
    ///
    /// Returns `Ok(None)` when the engine or thread tracking is disabled,
    /// the slot id otherwise. Fails closed once the registry is full.
    pub fn register_thread(&self) -> Result<Option<usize>> {
        if !self.is_enabled() || !self.read_config().track_threads {
            return Ok(None);
        }
        self.registry.register().map(Some)
    }

    /// Unregister the calling worker thread; a no-op if it never registered.
    pub fn unregister_thread(&self) {
        if !self.is_enabled() || !self.read_config().track_threads {
            return;
        }
        self.registry.unregister();
    }

    /// Number of currently registered worker threads.
    pub fn thread_count(&self) -> usize {
        self.registry.thread_count()
    }

    /// High-water mark of concurrently registered threads.
    pub fn max_threads_seen(&self) -> usize {
        self.registry.max_threads_seen()
    }

    /// Snapshot of a registered thread's slot data.
    pub fn thread_slot(&self, slot_id: usize) -> Option<ThreadSlot> {
        self.registry.slot(slot_id)
    }

    /// Record the host runtime's thread number against the calling thread's
    /// registry slot.
    pub fn set_runtime_thread(&self, runtime_thread: usize) {
        self.registry.note_runtime_thread(runtime_thread);
    }

    /// Label the calling thread's registry slot.
    pub fn label_thread(&self, label: &str) {
        let max = self.read_config().max_label_len;
        self.registry.label_current(&clamp_label(label, max));
    }

    // ---- allocation tracking -------------------------------------------

    /// Count a tracked allocation of `size` bytes.
    pub fn track_allocation(&self, size: usize) {
        if !self.is_enabled() || !self.read_config().track_memory {
            return;
        }
        self.counters.record_allocation(size);
    }

    /// Count a tracked deallocation of `size` bytes.
    pub fn track_deallocation(&self, size: usize) {
        if !self.is_enabled() || !self.read_config().track_memory {
            return;
        }
        self.counters.record_deallocation(size);
    }

    pub fn allocation_count(&self) -> u64 {
        self.counters.allocations()
    }

    pub fn bytes_allocated(&self) -> u64 {
        self.counters.bytes_allocated()
    }

    pub fn bytes_freed(&self) -> u64 {
        self.counters.bytes_freed()
    }

    /// Current resident set size in KB; 0 when the probe fails.
    pub fn current_rss_kb(&self) -> u64 {
        sample_memory(&self.counters)
            .map(|memory| memory.rss_kb)
            .unwrap_or(0)
    }

    /// Peak RSS in KB: the larger of the OS-reported peak and the watermark
    /// maintained across records.
    pub fn peak_rss_kb(&self) -> u64 {
        let probed = sample_memory(&self.counters)
            .map(|memory| memory.peak_rss_kb)
            .unwrap_or(0);
        probed.max(self.peak_memory_kb.load(Ordering::Relaxed))
    }

    // ---- milestone tracking --------------------------------------------

    pub fn start_milestone(&self, kind: MilestoneKind) {
        self.start_milestone_labeled(kind, "");
    }

    /// Mark `kind` active for the calling thread. The label is recorded on
    /// the matching end call, not here.
    pub fn start_milestone_labeled(&self, kind: MilestoneKind, _label: &str) {
        if !self.is_enabled() {
            return;
        }
        tracker::set_pending(self.epoch, kind, Timestamp::now());
    }

    pub fn end_milestone(&self, kind: MilestoneKind) {
        self.end_milestone_labeled(kind, "");
    }

    /// Close the pending start for `kind` on the calling thread and append a
    /// record. Without a matching start this is a no-op.
    pub fn end_milestone_labeled(&self, kind: MilestoneKind, label: &str) {
        if !self.is_enabled() {
            return;
        }
        let Some(started_at) = tracker::take_pending(self.epoch, kind) else {
            return;
        };

        let end = Timestamp::now();
        let duration_ms = clock::diff_ms(started_at, end).max(0.0);
        let record = self.build_record(kind, end, duration_ms, None, None, label, "");
        self.append(record);
    }

    /// RAII scope for a milestone; dropping the guard ends it.
    pub fn scoped(&self, kind: MilestoneKind) -> MilestoneGuard<'_> {
        MilestoneGuard::new(self, kind, "")
    }

    /// RAII scope for a labeled milestone.
    pub fn scoped_labeled<'a>(&'a self, kind: MilestoneKind, label: &str) -> MilestoneGuard<'a> {
        MilestoneGuard::new(self, kind, label)
    }

    // ---- event API ------------------------------------------------------

    /// Log a generic event; `value` is stored in the duration field.
    pub fn log_event(&self, label: &str, value: f64) {
        self.log_event_with_context(label, value, "");
    }

    /// Log a generic event with a context string.
    pub fn log_event_with_context(&self, label: &str, value: f64, context: &str) {
        if !self.is_enabled() {
            return;
        }
        let record = self.build_record(
            MilestoneKind::User1,
            Timestamp::now(),
            value,
            None,
            None,
            label,
            context,
        );
        self.append(record);
    }

    /// Log one clustering iteration with its convergence metric.
    pub fn log_iteration(&self, iteration: u64, convergence_metric: f64) {
        if !self.is_enabled() {
            return;
        }
        let record = self.build_record(
            MilestoneKind::ClusteringIteration,
            Timestamp::now(),
            0.0,
            Some(iteration),
            Some(convergence_metric),
            &format!("iteration_{}", iteration),
            &format!("convergence={:.6}", convergence_metric),
        );
        self.append(record);
    }

    /// Log a named algorithm step with its metric.
    pub fn log_algorithm_step(&self, algorithm: &str, step: &str, metric: f64) {
        self.log_event_with_context(
            &format!("{}_{}", algorithm, step),
            metric,
            &format!("metric={:.6}", metric),
        );
    }

    // ---- statistics ------------------------------------------------------

    /// Duration statistics for every record of `kind`.
    pub fn milestone_statistics(&self, kind: MilestoneKind) -> Result<MilestoneStatistics> {
        let buffer = self.read_buffer();
        let samples: Vec<f64> = buffer
            .iter()
            .filter(|record| record.milestone == kind)
            .map(|record| record.duration_ms)
            .collect();
        MilestoneStatistics::from_samples(samples).ok_or(PerfError::NoSamples(kind))
    }

    /// Global summary over the whole buffer.
    pub fn summary(&self) -> Summary {
        // Refresh the peak-memory watermark so a summary taken without any
        // recent record still reflects current usage.
        if self.is_enabled() && self.read_config().track_memory {
            if let Ok(memory) = sample_memory(&self.counters) {
                self.note_peak(&memory);
            }
        }

        let program_start = *self.read_program_start();
        let total_runtime_ms = clock::diff_ms(program_start, Timestamp::now()).max(0.0);

        let buffer = self.read_buffer();
        let mut milestones = Vec::new();
        for kind in MilestoneKind::ALL {
            let samples: Vec<f64> = buffer
                .iter()
                .filter(|record| record.milestone == kind)
                .map(|record| record.duration_ms)
                .collect();
            if let Some(stats) = MilestoneStatistics::from_samples(samples) {
                milestones.push(MilestoneRow {
                    milestone: kind,
                    stats,
                });
            }
        }

        Summary {
            total_runtime_ms,
            peak_memory_kb: self.peak_memory_kb.load(Ordering::Relaxed),
            max_threads: self.registry.max_threads_seen(),
            total_allocations: self.counters.allocations(),
            total_bytes_allocated: self.counters.bytes_allocated(),
            log_entries: buffer.len(),
            dropped_records: buffer.dropped(),
            milestones,
        }
    }

    // ---- log buffer state ------------------------------------------------

    pub fn log_count(&self) -> usize {
        self.read_buffer().len()
    }

    pub fn log_capacity(&self) -> usize {
        self.read_buffer().capacity()
    }

    /// Records lost to buffer exhaustion since init or the last reset.
    pub fn dropped_records(&self) -> u64 {
        self.read_buffer().dropped()
    }

    // ---- output ----------------------------------------------------------

    /// Serialize the full current buffer to the configured destination in
    /// the configured format. Does not clear the buffer; flushing to a file
    /// rewrites it.
    pub fn flush(&self) -> Result<()> {
        let (format, destination) = {
            let config = self.read_config();
            (config.output_format, config.destination.clone())
        };
        let buffer = self.read_buffer();
        match destination {
            Destination::Stderr => {
                output::write_records(&mut io::stderr().lock(), format, buffer.iter())
            }
            Destination::Stdout => {
                output::write_records(&mut io::stdout().lock(), format, buffer.iter())
            }
            Destination::File(path) => {
                let mut writer = BufWriter::new(File::create(path)?);
                output::write_records(&mut writer, format, buffer.iter())
            }
        }
    }

    /// Write the buffer to `path` as CSV, independent of the configured
    /// destination and format.
    pub fn export_csv(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        output::write_records(&mut writer, OutputFormat::Csv, self.read_buffer().iter())
    }

    /// Write the buffer to `path` as JSON.
    pub fn export_json(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        output::write_records(&mut writer, OutputFormat::Json, self.read_buffer().iter())
    }

    /// Print the human-readable summary block to stderr.
    pub fn print_summary(&self) {
        if !self.is_enabled() {
            return;
        }
        eprint!("\n{}\n", output::summary_text(&self.summary()));
    }

    /// Render the summary plus the per-milestone statistics table.
    pub fn detailed_report(&self) -> String {
        let summary = self.summary();
        let mut report = output::summary_text(&summary);
        if !summary.milestones.is_empty() {
            report.push('\n');
            report.push_str(&output::statistics_table(&summary.milestones));
            report.push('\n');
        }
        report
    }

    /// Print the detailed report to stderr.
    pub fn print_detailed_report(&self) {
        if !self.is_enabled() {
            return;
        }
        eprint!("\n{}\n", self.detailed_report());
    }

    // ---- lifecycle -------------------------------------------------------

    /// Clear the log, counters and watermarks and restamp the program start,
    /// without reallocating the buffer. A no-op while disabled.
    pub fn reset(&self) {
        if !self.is_enabled() {
            return;
        }
        self.write_buffer().clear();
        self.counters.reset();
        self.cpu_sampler.reset();
        self.peak_memory_kb.store(0, Ordering::Relaxed);
        self.registry.reset_watermark();
        *self.write_program_start() = Timestamp::now();
    }

    // ---- internals -------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn build_record(
        &self,
        milestone: MilestoneKind,
        timestamp: Timestamp,
        duration_ms: f64,
        iteration: Option<u64>,
        convergence_metric: Option<f64>,
        label: &str,
        context: &str,
    ) -> MetricRecord {
        let (track_memory, track_cpu, max_label_len) = {
            let config = self.read_config();
            (config.track_memory, config.track_cpu, config.max_label_len)
        };

        let memory = if track_memory {
            match sample_memory(&self.counters) {
                Ok(memory) => {
                    self.note_peak(&memory);
                    memory
                }
                Err(err) => {
                    log::warn!("memory probe failed: {}", err);
                    MemorySnapshot::default()
                }
            }
        } else {
            MemorySnapshot::default()
        };

        let cpu = if track_cpu {
            match self.cpu_sampler.sample() {
                Ok(cpu) => cpu,
                Err(err) => {
                    log::warn!("cpu probe failed: {}", err);
                    CpuSnapshot::default()
                }
            }
        } else {
            CpuSnapshot::default()
        };

        self.registry.note_operation(memory, cpu);

        MetricRecord {
            milestone,
            timestamp,
            duration_ms,
            memory,
            cpu,
            thread_count: self.registry.thread_count(),
            iteration,
            convergence_metric,
            label: clamp_label(label, max_label_len),
            context: clamp_label(context, max_label_len),
        }
    }

    fn append(&self, record: MetricRecord) {
        let appended = self.read_buffer().append(record);
        if !appended {
            log::debug!("log buffer full, record dropped");
            return;
        }
        if self.read_config().flush_immediately {
            if let Err(err) = self.flush() {
                log::warn!("immediate flush failed: {}", err);
            }
        }
    }

    fn note_peak(&self, memory: &MemorySnapshot) {
        let peak = memory.peak_rss_kb.max(memory.rss_kb);
        self.peak_memory_kb.fetch_max(peak, Ordering::Relaxed);
    }

    // Lock wrappers: the guarded state stays usable even if a panic in the
    // host poisoned a lock, and the engine must never propagate one.
    fn read_config(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_config(&self) -> RwLockWriteGuard<'_, Config> {
        self.config.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_buffer(&self) -> RwLockReadGuard<'_, LogBuffer> {
        self.buffer.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_buffer(&self) -> RwLockWriteGuard<'_, LogBuffer> {
        self.buffer.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_program_start(&self) -> RwLockReadGuard<'_, Timestamp> {
        self.program_start.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_program_start(&self) -> RwLockWriteGuard<'_, Timestamp> {
        self.program_start
            .write()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for PerfContext {
    fn drop(&mut self) {
        if self.is_enabled() && !self.read_buffer().is_empty() {
            if let Err(err) = self.flush() {
                log::debug!("flush on drop failed: {}", err);
            }
        }
    }
}

impl std::fmt::Debug for PerfContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerfContext")
            .field("enabled", &self.is_enabled())
            .field("log_count", &self.log_count())
            .field("log_capacity", &self.log_capacity())
            .field("thread_count", &self.thread_count())
            .finish()
    }
}
