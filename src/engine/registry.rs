//! Id Registry - Identity allocation for one runtime.
//!
//! Registrars, tracking sessions, function nodes and focusables all draw from
//! one monotonically increasing counter. Ids are never reused, so a stale id
//! held by a dropped handle can't alias a live object.

use std::cell::Cell;

#[derive(Debug, Default)]
pub(crate) struct IdRegistry {
    next: Cell<u64>,
}

impl IdRegistry {
    pub(crate) fn allocate(&self) -> u64 {
        let id = self.next.get() + 1;
        self.next.set(id);
        id
    }

    /// Number of ids handed out so far.
    pub(crate) fn allocated(&self) -> u64 {
        self.next.get()
    }
}
