//! Platform resource probes.
//!
//! Memory comes from `/proc/self/status` via `procfs` on Linux with a
//! `sysinfo` fallback elsewhere; CPU times come from `getrusage` on Linux.
//! Probe failure is always an error the caller can degrade on, never a
//! crash.

mod cpu;
mod memory;

pub use cpu::CpuSampler;
pub use memory::sample_memory;
