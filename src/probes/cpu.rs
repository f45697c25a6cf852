//! Process CPU probe.
//!
//! Percent utilization is derived by differencing accumulated CPU time
//! against the previous sample over elapsed wall time. The previous-sample
//! baseline is shared by all callers, so it lives behind a dedicated lock;
//! the first sample after construction reads 0%.

use std::sync::Mutex;
use std::time::Instant;

use crate::error::Result;
use crate::metrics::CpuSnapshot;

#[derive(Debug, Clone, Copy)]
struct Baseline {
    wall: Instant,
    cpu_secs: f64,
}

pub struct CpuSampler {
    last: Mutex<Option<Baseline>>,
}

impl CpuSampler {
    pub fn new() -> Self {
        CpuSampler {
            last: Mutex::new(None),
        }
    }

    /// Sample accumulated user/system CPU time and the utilization since the
    /// previous sample taken through this sampler.
    pub fn sample(&self) -> Result<CpuSnapshot> {
        let (user_time, system_time) = process_cpu_times()?;
        let now = Instant::now();
        let cpu_secs = user_time + system_time;

        let mut snapshot = CpuSnapshot {
            user_time,
            system_time,
            ..CpuSnapshot::default()
        };

        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(baseline) = *last {
            let wall_secs = now.duration_since(baseline.wall).as_secs_f64();
            if wall_secs > 0.0 {
                let cpu_delta = (cpu_secs - baseline.cpu_secs).max(0.0);
                snapshot.cpu_percent = cpu_delta / wall_secs * 100.0;
            }
        }
        *last = Some(Baseline { wall: now, cpu_secs });

        Ok(snapshot)
    }

    /// Reset the rolling baseline; the next sample reads 0% again.
    pub fn reset(&self) {
        *self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn process_cpu_times() -> Result<(f64, f64)> {
    use crate::error::PerfError;

    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    // SAFETY: getrusage writes a fully initialized rusage on success.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return Err(PerfError::ProbeUnavailable("getrusage"));
    }
    Ok((timeval_secs(usage.ru_utime), timeval_secs(usage.ru_stime)))
}

#[cfg(target_os = "linux")]
fn timeval_secs(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}

// No rusage on this path; CPU times degrade to zero and percent stays 0.
#[cfg(not(target_os = "linux"))]
fn process_cpu_times() -> Result<(f64, f64)> {
    Ok((0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_has_no_baseline() {
        let sampler = CpuSampler::new();
        let snapshot = sampler.sample().unwrap();
        assert_eq!(snapshot.cpu_percent, 0.0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn busy_loop_registers_cpu_time() {
        let sampler = CpuSampler::new();
        sampler.sample().unwrap();

        // Burn some CPU between samples.
        let mut acc = 0u64;
        for i in 0..5_000_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        std::hint::black_box(acc);

        let snapshot = sampler.sample().unwrap();
        assert!(snapshot.user_time + snapshot.system_time > 0.0);
        assert!(snapshot.cpu_percent >= 0.0);
    }

    #[test]
    fn reset_clears_the_baseline() {
        let sampler = CpuSampler::new();
        sampler.sample().unwrap();
        sampler.reset();
        let snapshot = sampler.sample().unwrap();
        assert_eq!(snapshot.cpu_percent, 0.0);
    }
}
