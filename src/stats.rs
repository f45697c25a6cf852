//! Aggregate statistics over logged durations.

use serde::Serialize;

use crate::milestone::MilestoneKind;

/// Per-milestone duration statistics.
///
/// Standard deviation is the population form. Percentiles index the
/// ascending-sorted sample set at `floor(p * n)`.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneStatistics {
    pub sample_count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub percentile_95: f64,
    pub percentile_99: f64,
}

impl MilestoneStatistics {
    /// Compute statistics over a sample set. Returns `None` when empty.
    pub fn from_samples(mut samples: Vec<f64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(f64::total_cmp);

        let n = samples.len();
        let min = samples[0];
        let max = samples[n - 1];
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples
            .iter()
            .map(|sample| {
                let diff = sample - mean;
                diff * diff
            })
            .sum::<f64>()
            / n as f64;

        let median = if n % 2 == 1 {
            samples[n / 2]
        } else {
            (samples[n / 2 - 1] + samples[n / 2]) / 2.0
        };

        Some(MilestoneStatistics {
            sample_count: n,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
            median,
            percentile_95: percentile(&samples, 0.95),
            percentile_99: percentile(&samples, 0.99),
        })
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let index = ((p * sorted.len() as f64) as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Per-kind entry of the summary's statistics table.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneRow {
    pub milestone: MilestoneKind,
    pub stats: MilestoneStatistics,
}

/// Global performance summary over the whole log buffer.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_runtime_ms: f64,
    pub peak_memory_kb: u64,
    pub max_threads: usize,
    pub total_allocations: u64,
    pub total_bytes_allocated: u64,
    pub log_entries: usize,
    pub dropped_records: u64,
    /// Statistics for every kind with at least one sample.
    pub milestones: Vec<MilestoneRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_set_yields_none() {
        assert!(MilestoneStatistics::from_samples(Vec::new()).is_none());
    }

    #[test]
    fn known_sample_set() {
        let stats = MilestoneStatistics::from_samples(vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(stats.sample_count, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
        assert!((stats.std_dev - 2.0f64.sqrt()).abs() < 1e-9);
        assert_eq!(stats.median, 3.0);
        // floor(0.95 * 5) = 4, floor(0.99 * 5) = 4
        assert_eq!(stats.percentile_95, 5.0);
        assert_eq!(stats.percentile_99, 5.0);
    }

    #[test]
    fn unordered_input_is_sorted_first() {
        let stats = MilestoneStatistics::from_samples(vec![4.0, 1.0, 5.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.median, 3.0);
    }

    #[test]
    fn single_sample() {
        let stats = MilestoneStatistics::from_samples(vec![7.5]).unwrap();
        assert_eq!(stats.min, 7.5);
        assert_eq!(stats.max, 7.5);
        assert_eq!(stats.mean, 7.5);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.percentile_95, 7.5);
    }

    #[test]
    fn even_sample_count_median_averages_middles() {
        let stats = MilestoneStatistics::from_samples(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.median, 2.5);
    }
}
