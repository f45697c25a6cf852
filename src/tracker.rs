//! Milestone start/end bookkeeping.
//!
//! Pending-start state is keyed by (milestone kind, calling thread): each
//! thread keeps its own pending table in thread-local storage, so concurrent
//! starts of the same kind on different threads cannot clobber each other.
//! Entries are tagged with the owning context's epoch; a stale entry left by
//! a previous context never matches and is simply overwritten.

use std::cell::RefCell;

use crate::clock::Timestamp;
use crate::context::PerfContext;
use crate::milestone::MilestoneKind;

#[derive(Debug, Clone, Copy)]
struct PendingStart {
    epoch: u64,
    started_at: Timestamp,
}

thread_local! {
    static PENDING: RefCell<[Option<PendingStart>; MilestoneKind::COUNT]> =
        const { RefCell::new([None; MilestoneKind::COUNT]) };
}

/// Mark `kind` active for the calling thread. A second start of the same
/// kind on the same thread overwrites the first's timestamp.
pub(crate) fn set_pending(epoch: u64, kind: MilestoneKind, started_at: Timestamp) {
    PENDING.with_borrow_mut(|table| {
        table[kind.index()] = Some(PendingStart { epoch, started_at });
    });
}

/// Take the pending start for `kind` on the calling thread, clearing it.
/// Returns `None` when no matching start exists (including entries left by a
/// different context).
pub(crate) fn take_pending(epoch: u64, kind: MilestoneKind) -> Option<Timestamp> {
    PENDING.with_borrow_mut(|table| {
        let entry = table[kind.index()].take()?;
        (entry.epoch == epoch).then_some(entry.started_at)
    })
}

/// True while a start for `kind` is pending on the calling thread.
#[cfg(test)]
pub(crate) fn is_pending(epoch: u64, kind: MilestoneKind) -> bool {
    PENDING.with_borrow(|table| {
        matches!(table[kind.index()], Some(entry) if entry.epoch == epoch)
    })
}

/// Scope guard that ends a milestone when dropped, so early-return paths
/// cannot leave it active.
///
/// Created through [`PerfContext::scoped`] or [`PerfContext::scoped_labeled`].
pub struct MilestoneGuard<'a> {
    context: &'a PerfContext,
    kind: MilestoneKind,
    label: String,
}

impl<'a> MilestoneGuard<'a> {
    pub(crate) fn new(context: &'a PerfContext, kind: MilestoneKind, label: &str) -> Self {
        context.start_milestone_labeled(kind, label);
        MilestoneGuard {
            context,
            kind,
            label: label.to_string(),
        }
    }

    /// The milestone kind this guard tracks.
    pub fn kind(&self) -> MilestoneKind {
        self.kind
    }
}

impl Drop for MilestoneGuard<'_> {
    fn drop(&mut self) {
        self.context.end_milestone_labeled(self.kind, &self.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_pending_entry() {
        let ts = Timestamp::now();
        set_pending(900, MilestoneKind::FastaParse, ts);
        assert!(is_pending(900, MilestoneKind::FastaParse));
        assert_eq!(take_pending(900, MilestoneKind::FastaParse), Some(ts));
        assert_eq!(take_pending(900, MilestoneKind::FastaParse), None);
    }

    #[test]
    fn stale_epochs_do_not_match() {
        set_pending(901, MilestoneKind::TreeNodeCreation, Timestamp::now());
        assert!(!is_pending(902, MilestoneKind::TreeNodeCreation));
        assert_eq!(take_pending(902, MilestoneKind::TreeNodeCreation), None);
        // The stale entry was consumed; the old epoch no longer matches
        // either.
        assert_eq!(take_pending(901, MilestoneKind::TreeNodeCreation), None);
    }

    #[test]
    fn kinds_are_independent() {
        let ts = Timestamp::now();
        set_pending(903, MilestoneKind::KalignExecution, ts);
        assert_eq!(take_pending(903, MilestoneKind::Wfa2Execution), None);
        assert_eq!(take_pending(903, MilestoneKind::KalignExecution), Some(ts));
    }
}
