//! Thread registry and process-wide allocation counters.
//!
//! Each worker thread registers once, receives a dense slot id (0-based,
//! monotonically assigned, never reused within the context's lifetime) and
//! stores it in thread-local storage for the tracker to consult. Slot data is
//! owned by its thread between register and unregister; reporting may read a
//! snapshot through the per-slot lock.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::clock::Timestamp;
use crate::error::{PerfError, Result};
use crate::metrics::{CpuSnapshot, MemorySnapshot};

thread_local! {
    // (context epoch, slot id) of the calling thread's registration.
    static CURRENT_SLOT: Cell<Option<(u64, usize)>> = const { Cell::new(None) };
}

/// Per-registered-thread record.
#[derive(Debug, Clone, Default)]
pub struct ThreadSlot {
    pub slot_id: usize,
    /// Thread number reported by the host's parallel runtime, if any.
    pub runtime_thread: Option<usize>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub last_memory: MemorySnapshot,
    pub last_cpu: CpuSnapshot,
    pub operations: u64,
    pub label: String,
}

/// Process-wide cumulative allocation counters, mutated lock-free from any
/// thread.
#[derive(Debug, Default)]
pub struct AllocationCounters {
    allocations: AtomicU64,
    frees: AtomicU64,
    bytes_allocated: AtomicU64,
    bytes_freed: AtomicU64,
}

impl AllocationCounters {
    pub fn record_allocation(&self, size: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_deallocation(&self, size: usize) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        self.bytes_freed.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn frees(&self) -> u64 {
        self.frees.load(Ordering::Relaxed)
    }

    pub fn bytes_allocated(&self) -> u64 {
        self.bytes_allocated.load(Ordering::Relaxed)
    }

    pub fn bytes_freed(&self) -> u64 {
        self.bytes_freed.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.allocations.store(0, Ordering::Relaxed);
        self.frees.store(0, Ordering::Relaxed);
        self.bytes_allocated.store(0, Ordering::Relaxed);
        self.bytes_freed.store(0, Ordering::Relaxed);
    }
}

pub struct ThreadRegistry {
    slots: Box<[Mutex<ThreadSlot>]>,
    next_slot: AtomicUsize,
    active: AtomicUsize,
    max_seen: AtomicUsize,
    epoch: u64,
}

impl ThreadRegistry {
    pub fn new(capacity: usize, epoch: u64) -> Self {
        let slots: Box<[Mutex<ThreadSlot>]> = (0..capacity)
            .map(|_| Mutex::new(ThreadSlot::default()))
            .collect();
        ThreadRegistry {
            slots,
            next_slot: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
            epoch,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Register the calling thread and return its slot id.
    ///
    /// Slot ids are assigned by fetch-add and never recycled; once the table
    /// is exhausted registration fails closed rather than writing out of
    /// range.
    pub fn register(&self) -> Result<usize> {
        let slot_id = self.next_slot.fetch_add(1, Ordering::AcqRel);
        if slot_id >= self.slots.len() {
            return Err(PerfError::ThreadCapacity {
                capacity: self.slots.len(),
            });
        }

        let active = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_seen.fetch_max(active, Ordering::AcqRel);

        {
            let mut slot = lock(&self.slots[slot_id]);
            *slot = ThreadSlot {
                slot_id,
                start: Some(Timestamp::now()),
                ..ThreadSlot::default()
            };
        }
        CURRENT_SLOT.set(Some((self.epoch, slot_id)));
        Ok(slot_id)
    }

    /// Unregister the calling thread. A thread that never registered with
    /// this registry is a no-op.
    pub fn unregister(&self) {
        let Some(slot_id) = self.current_slot() else {
            return;
        };
        if let Some(slot) = self.slots.get(slot_id) {
            lock(slot).end = Some(Timestamp::now());
        }
        self.active.fetch_sub(1, Ordering::AcqRel);
        CURRENT_SLOT.set(None);
    }

    /// Slot id of the calling thread, if registered with this registry.
    pub fn current_slot(&self) -> Option<usize> {
        match CURRENT_SLOT.get() {
            Some((epoch, slot_id)) if epoch == self.epoch => Some(slot_id),
            _ => None,
        }
    }

    /// Number of currently registered threads.
    pub fn thread_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// High-water mark of concurrently registered threads.
    pub fn max_threads_seen(&self) -> usize {
        self.max_seen.load(Ordering::Acquire)
    }

    /// Snapshot of a slot's data, for reporting.
    pub fn slot(&self, slot_id: usize) -> Option<ThreadSlot> {
        self.slots.get(slot_id).map(|slot| lock(slot).clone())
    }

    /// Record an operation and the latest snapshots against the calling
    /// thread's slot.
    pub fn note_operation(&self, memory: MemorySnapshot, cpu: CpuSnapshot) {
        let Some(slot_id) = self.current_slot() else {
            return;
        };
        if let Some(slot) = self.slots.get(slot_id) {
            let mut slot = lock(slot);
            slot.operations += 1;
            slot.last_memory = memory;
            slot.last_cpu = cpu;
        }
    }

    /// Record the thread number the host's parallel runtime assigned to the
    /// calling thread.
    pub fn note_runtime_thread(&self, runtime_thread: usize) {
        let Some(slot_id) = self.current_slot() else {
            return;
        };
        if let Some(slot) = self.slots.get(slot_id) {
            lock(slot).runtime_thread = Some(runtime_thread);
        }
    }

    /// Label the calling thread's slot.
    pub fn label_current(&self, label: &str) {
        let Some(slot_id) = self.current_slot() else {
            return;
        };
        if let Some(slot) = self.slots.get(slot_id) {
            lock(slot).label = label.to_string();
        }
    }

    /// Reset the high-water mark. Active registrations are untouched.
    pub fn reset_watermark(&self) {
        self.max_seen
            .store(self.active.load(Ordering::Acquire), Ordering::Release);
    }
}

// Slot locks guard plain data; a poisoned lock still holds usable state.
fn lock<'a>(slot: &'a Mutex<ThreadSlot>) -> MutexGuard<'a, ThreadSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
