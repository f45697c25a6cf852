//! Bounded, append-only store of metric records.
//!
//! Concurrent appenders each reserve a disjoint slot with a fetch-add on the
//! write index, so no two threads ever write the same slot and no increment
//! is lost. Once the capacity is exhausted further appends are dropped and
//! counted; the buffer never grows and never blocks.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::metrics::MetricRecord;

pub struct LogBuffer {
    slots: Box<[OnceLock<MetricRecord>]>,
    reserved: AtomicUsize,
    dropped: AtomicU64,
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots: Box<[OnceLock<MetricRecord>]> =
            (0..capacity).map(|_| OnceLock::new()).collect();
        LogBuffer {
            slots,
            reserved: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of appended records, never above `capacity()`.
    pub fn len(&self) -> usize {
        self.reserved.load(Ordering::Acquire).min(self.slots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records lost to capacity exhaustion since the last clear.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Append a record. Returns `false` if the buffer is full and the record
    /// was dropped.
    pub fn append(&self, record: MetricRecord) -> bool {
        let index = self.reserved.fetch_add(1, Ordering::AcqRel);
        if index >= self.slots.len() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        // The slot belongs exclusively to this reservation.
        let _ = self.slots[index].set(record);
        true
    }

    /// Iterate over appended records in slot order.
    ///
    /// Slot order matches reservation order, which for near-simultaneous
    /// appends from different threads is not guaranteed to match wall-clock
    /// start order.
    pub fn iter(&self) -> impl Iterator<Item = &MetricRecord> {
        self.slots[..self.len()].iter().filter_map(|slot| slot.get())
    }

    /// Drop all records and reset the drop counter without reallocating.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.take();
        }
        self.reserved.store(0, Ordering::Release);
        self.dropped.store(0, Ordering::Relaxed);
    }
}
