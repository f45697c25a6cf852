//! Process memory probe.

use crate::error::Result;
use crate::metrics::MemorySnapshot;
use crate::threads::AllocationCounters;

/// Sample resident/virtual/peak memory for the current process and merge in
/// the cumulative allocation counters.
pub fn sample_memory(counters: &AllocationCounters) -> Result<MemorySnapshot> {
    let mut snapshot = read_os_memory()?;
    snapshot.heap_allocated = counters.bytes_allocated();
    snapshot.heap_freed = counters.bytes_freed();
    snapshot.allocation_count = counters.allocations();
    snapshot.free_count = counters.frees();
    Ok(snapshot)
}

#[cfg(target_os = "linux")]
fn read_os_memory() -> Result<MemorySnapshot> {
    use crate::error::PerfError;

    let status = procfs::process::Process::myself()
        .and_then(|process| process.status())
        .map_err(|_| PerfError::ProbeUnavailable("procfs status"))?;

    // VmPeak/VmSize/VmRSS are reported in kB; kernel threads omit them.
    Ok(MemorySnapshot {
        rss_kb: status.vmrss.unwrap_or(0),
        virt_kb: status.vmsize.unwrap_or(0),
        peak_rss_kb: status.vmpeak.unwrap_or(0),
        ..MemorySnapshot::default()
    })
}

#[cfg(not(target_os = "linux"))]
fn read_os_memory() -> Result<MemorySnapshot> {
    use crate::error::PerfError;
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    let pid = Pid::from(std::process::id() as usize);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::everything(),
    );
    let process = system
        .process(pid)
        .ok_or(PerfError::ProbeUnavailable("sysinfo process"))?;

    // sysinfo reports bytes; no peak figure is available on this path.
    let rss_kb = process.memory() / 1024;
    Ok(MemorySnapshot {
        rss_kb,
        virt_kb: process.virtual_memory() / 1024,
        peak_rss_kb: rss_kb,
        ..MemorySnapshot::default()
    })
}
