//! Metric record types shared by the tracker, the log buffer and the
//! output formatters.

use serde::Serialize;

use crate::clock::Timestamp;
use crate::milestone::MilestoneKind;

/// Memory usage at record time.
///
/// `rss_kb`/`virt_kb`/`peak_rss_kb` come from the OS probe; the heap fields
/// are process-wide cumulative counts aggregated from the allocation
/// counters, not per-record deltas.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MemorySnapshot {
    pub rss_kb: u64,
    pub virt_kb: u64,
    pub peak_rss_kb: u64,
    pub heap_allocated: u64,
    pub heap_freed: u64,
    pub allocation_count: u64,
    pub free_count: u64,
}

/// CPU usage at record time.
///
/// `cpu_percent` is derived by differencing against the sampler's previous
/// sample over elapsed wall time; the first sample after init reads 0%.
/// `context_switches` and `cache_misses` are reserved and stay zero.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CpuSnapshot {
    pub cpu_percent: f64,
    pub user_time: f64,
    pub system_time: f64,
    pub context_switches: u64,
    pub cache_misses: u64,
}

/// One logged measurement, immutable once appended to the log buffer.
///
/// For milestone records `duration_ms` is the elapsed start-to-end time; for
/// generic events it carries the event value instead.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRecord {
    pub milestone: MilestoneKind,
    pub timestamp: Timestamp,
    pub duration_ms: f64,
    pub memory: MemorySnapshot,
    pub cpu: CpuSnapshot,
    pub thread_count: usize,
    pub iteration: Option<u64>,
    pub convergence_metric: Option<f64>,
    pub label: String,
    pub context: String,
}

/// Truncate a label or context string to at most `max` bytes, on a char
/// boundary.
pub(crate) fn clamp_label(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut cut = max;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_labels_pass_through() {
        assert_eq!(clamp_label("kalign", 64), "kalign");
        assert_eq!(clamp_label("", 64), "");
    }

    #[test]
    fn long_labels_truncate_to_byte_budget() {
        let long = "x".repeat(200);
        let clamped = clamp_label(&long, 64);
        assert_eq!(clamped.len(), 64);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "ab\u{00e9}\u{00e9}"; // 2 + 2*2 bytes
        let clamped = clamp_label(text, 3);
        assert_eq!(clamped, "ab");
    }

    #[test]
    fn record_serializes_with_milestone_name() {
        let record = MetricRecord {
            milestone: MilestoneKind::FastaParse,
            timestamp: Timestamp::default(),
            duration_ms: 1.5,
            memory: MemorySnapshot::default(),
            cpu: CpuSnapshot::default(),
            thread_count: 4,
            iteration: None,
            convergence_metric: None,
            label: "chunk_0".to_string(),
            context: String::new(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"FASTA_PARSE\""));
        assert!(json.contains("\"thread_count\":4"));
    }
}
