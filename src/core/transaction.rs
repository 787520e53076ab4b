//! Transaction handle and fix-mode (spec §3.1). Grounded on the teacher's
//! `core/transaction.rs` (`Transaction` state machine, operation log) and
//! `mvcc/controller.rs` (snapshot-handle idiom), simplified per the "no
//! transactional MVCC" non-goal: a handle here only authorizes the fix-mode
//! a page fix is performed under and tracks which pages it currently holds
//! so they can be released on drop. There is no version map, no snapshot,
//! no commit/rollback log.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::types::ObjectId;

static TRANSACTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// The mode a page (or area) is fixed under (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixMode {
    /// Read-only fix; concurrent `ReadOnly` fixes of the same page are fine.
    ReadOnly,
    /// Read-write fix; the page's content may be mutated before unfix.
    Write,
    /// Fix a brand-new page, allocated by the pager as part of this fix.
    Allocate,
    /// A fix whose backing page may be evicted without being written back
    /// (used for scratch/working pages that are never persisted).
    Discardable,
}

impl FixMode {
    pub fn is_mutating(self) -> bool {
        matches!(self, FixMode::Write | FixMode::Allocate)
    }
}

/// A handle authorizing a sequence of page fixes against one or more files.
///
/// `TransactionHandle` does not provide isolation or atomicity guarantees;
/// it is bookkeeping that lets the pager release every page a caller fixed
/// if the caller is dropped (e.g. on an error path) without an explicit
/// unfix call for each one.
pub struct TransactionHandle {
    id: u64,
    fixed: HashSet<ObjectId>,
}

impl TransactionHandle {
    pub fn new() -> Self {
        let id = TRANSACTION_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
        TransactionHandle {
            id,
            fixed: HashSet::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn note_fixed(&mut self, object: ObjectId) {
        self.fixed.insert(object);
    }

    pub(crate) fn note_unfixed(&mut self, object: ObjectId) {
        self.fixed.remove(&object);
    }

    /// Pages still fixed under this handle; callers should unfix all of
    /// these before the handle is dropped (a non-empty set here on drop
    /// indicates a leaked fix).
    pub fn outstanding_fixes(&self) -> impl Iterator<Item = &ObjectId> {
        self.fixed.iter()
    }
}

impl Default for TransactionHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handle_has_no_outstanding_fixes() {
        let handle = TransactionHandle::new();
        assert_eq!(handle.outstanding_fixes().count(), 0);
    }

    #[test]
    fn note_fixed_then_unfixed_clears() {
        let mut handle = TransactionHandle::new();
        let obj = ObjectId::new(crate::core::types::PageId(3), crate::core::types::AreaId(0));
        handle.note_fixed(obj);
        assert_eq!(handle.outstanding_fixes().count(), 1);
        handle.note_unfixed(obj);
        assert_eq!(handle.outstanding_fixes().count(), 0);
    }

    #[test]
    fn ids_are_distinct() {
        let a = TransactionHandle::new();
        let b = TransactionHandle::new();
        assert_ne!(a.id(), b.id());
    }
}
