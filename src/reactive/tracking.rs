//! Tracking - Dependency recording and invalidation.
//!
//! A tracking session records every property read while its computation runs.
//! When the computation finishes the session is *armed* with its
//! `on_invalidate` callback. The first write to any recorded property fires
//! that callback exactly once and retires the session. Recording again means
//! starting a new session.
//!
//! # Session lifecycle
//!
//! ```text
//! Recording ──finish──► Armed ──write──► (fired, removed)
//!     │                   │
//!     │ write             └──cancel──► (removed, never fires)
//!     ▼
//!   Stale ──finish──► fires immediately
//! ```
//!
//! Sessions nest: the innermost recording session receives reads. Reads made
//! inside [`Runtime::untracked`] are not recorded.
//!
//! Callbacks are always invoked after the tracking state borrow is released, so
//! they may read, write, track or cancel freely.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use super::registrar::PropertyKey;
use crate::diagnostics::invariant_violation;
use crate::engine::{Runtime, WeakRuntime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Recording,
    /// A recorded property was written before recording finished.
    Stale,
    Armed,
}

type Callback = Box<dyn FnOnce()>;

struct SessionEntry {
    observed: HashSet<PropertyKey>,
    status: SessionStatus,
    on_invalidate: Option<Callback>,
}

enum Arming {
    Armed,
    FireNow(Callback),
    Discarded(Callback),
}

// =============================================================================
// TRACKING STATE
// =============================================================================

#[derive(Default)]
pub(crate) struct TrackingState {
    stack: Vec<Option<SessionId>>,
    sessions: HashMap<SessionId, SessionEntry>,
    observers: HashMap<PropertyKey, HashSet<SessionId>>,
    mutating: HashMap<PropertyKey, usize>,
}

impl TrackingState {
    fn begin(&mut self, id: SessionId) {
        self.sessions.insert(
            id,
            SessionEntry {
                observed: HashSet::new(),
                status: SessionStatus::Recording,
                on_invalidate: None,
            },
        );
        self.stack.push(Some(id));
    }

    fn record(&mut self, key: PropertyKey) {
        let Some(Some(id)) = self.stack.last().copied() else {
            return;
        };
        let Some(entry) = self.sessions.get_mut(&id) else {
            return;
        };
        if entry.observed.insert(key) {
            self.observers.entry(key).or_default().insert(id);
        }
    }

    fn arm(&mut self, id: SessionId, callback: Callback) -> Arming {
        let status = match self.sessions.get(&id) {
            Some(entry) => entry.status,
            None => return Arming::Discarded(callback),
        };
        match status {
            SessionStatus::Stale => {
                self.remove_session(id);
                Arming::FireNow(callback)
            }
            SessionStatus::Recording | SessionStatus::Armed => {
                if let Some(entry) = self.sessions.get_mut(&id) {
                    entry.status = SessionStatus::Armed;
                    entry.on_invalidate = Some(callback);
                }
                Arming::Armed
            }
        }
    }

    fn invalidate(&mut self, key: PropertyKey) -> Vec<Callback> {
        let Some(sessions) = self.observers.remove(&key) else {
            return Vec::new();
        };
        let mut ids: Vec<_> = sessions.into_iter().collect();
        ids.sort();

        let mut fired = Vec::new();
        for id in ids {
            let Some(entry) = self.sessions.get_mut(&id) else {
                continue;
            };
            match entry.status {
                SessionStatus::Recording => entry.status = SessionStatus::Stale,
                SessionStatus::Stale => {}
                SessionStatus::Armed => {
                    if let Some(callback) = self.remove_session(id).and_then(|e| e.on_invalidate) {
                        fired.push(callback);
                    }
                }
            }
        }
        fired
    }

    fn remove_session(&mut self, id: SessionId) -> Option<SessionEntry> {
        let entry = self.sessions.remove(&id)?;
        for key in &entry.observed {
            if let Some(set) = self.observers.get_mut(key) {
                set.remove(&id);
                if set.is_empty() {
                    self.observers.remove(key);
                }
            }
        }
        Some(entry)
    }

    fn begin_mutation(&mut self, key: PropertyKey) {
        *self.mutating.entry(key).or_insert(0) += 1;
    }

    /// Returns false if there was no matching `begin_mutation`.
    fn end_mutation(&mut self, key: PropertyKey) -> bool {
        match self.mutating.get_mut(&key) {
            Some(depth) => {
                *depth -= 1;
                if *depth == 0 {
                    self.mutating.remove(&key);
                }
                true
            }
            None => false,
        }
    }

    fn observer_count(&self, key: PropertyKey) -> usize {
        self.observers.get(&key).map_or(0, HashSet::len)
    }
}

// =============================================================================
// TRACKING SESSION HANDLE
// =============================================================================

/// Owning handle for an armed session. Dropping it cancels the session.
#[must_use = "dropping a TrackingSession cancels it immediately"]
pub struct TrackingSession {
    id: SessionId,
    runtime: WeakRuntime,
    cancelled: Cell<bool>,
}

impl TrackingSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Whether the session is still waiting for a write.
    pub fn is_armed(&self) -> bool {
        if self.cancelled.get() {
            return false;
        }
        self.runtime.upgrade().is_some_and(|rt| {
            rt.inner
                .tracking
                .borrow()
                .sessions
                .get(&self.id)
                .is_some_and(|e| e.status == SessionStatus::Armed)
        })
    }

    /// Stop observing. A cancelled session never fires.
    pub fn cancel(&self) {
        if self.cancelled.replace(true) {
            return;
        }
        let Some(rt) = self.runtime.upgrade() else {
            return;
        };
        let removed = rt.inner.tracking.borrow_mut().remove_session(self.id);
        drop(removed);
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSession")
            .field("id", &self.id)
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}

/// Pops the recording stack even if the computation panics. A session whose
/// computation never finished is removed along with its observer links.
struct RecordingGuard<'a> {
    runtime: &'a Runtime,
    unfinished: Option<SessionId>,
}

impl RecordingGuard<'_> {
    fn finish(mut self) {
        self.unfinished = None;
    }
}

impl Drop for RecordingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.runtime.inner.tracking.try_borrow_mut() {
            state.stack.pop();
            if let Some(id) = self.unfinished.take() {
                let removed = state.remove_session(id);
                drop(removed);
            }
        }
    }
}

// =============================================================================
// RUNTIME TRACKING API
// =============================================================================

impl Runtime {
    /// Run `compute` while recording the properties it reads.
    ///
    /// `on_invalidate` fires once, on the first later write to any of them. If
    /// such a write already happened during `compute`, it fires right away.
    pub fn track<R>(
        &self,
        compute: impl FnOnce() -> R,
        on_invalidate: impl FnOnce() + 'static,
    ) -> (R, TrackingSession) {
        let id = SessionId(self.next_id());
        self.inner.tracking.borrow_mut().begin(id);

        let recording = RecordingGuard {
            runtime: self,
            unfinished: Some(id),
        };
        let value = compute();
        recording.finish();

        let arming = self
            .inner
            .tracking
            .borrow_mut()
            .arm(id, Box::new(on_invalidate));
        match arming {
            Arming::Armed => {}
            Arming::FireNow(callback) => {
                tracing::trace!(session = ?id, "dependency written while recording");
                callback();
            }
            Arming::Discarded(callback) => drop(callback),
        }

        let session = TrackingSession {
            id,
            runtime: self.downgrade(),
            cancelled: Cell::new(false),
        };
        (value, session)
    }

    /// Run `f` without recording its reads into the current session.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.tracking.borrow_mut().stack.push(None);
        let recording = RecordingGuard {
            runtime: self,
            unfinished: None,
        };
        let value = f();
        drop(recording);
        value
    }

    /// The innermost recording session, if any.
    pub fn current_session(&self) -> Option<SessionId> {
        self.inner.tracking.borrow().stack.last().copied().flatten()
    }

    /// Number of armed or recording sessions observing `key`.
    pub fn observer_count(&self, key: PropertyKey) -> usize {
        self.inner.tracking.borrow().observer_count(key)
    }

    pub(crate) fn record_access(&self, key: PropertyKey) {
        self.inner.tracking.borrow_mut().record(key);
    }

    pub(crate) fn will_set(&self, key: PropertyKey) {
        self.inner.tracking.borrow_mut().begin_mutation(key);
    }

    pub(crate) fn did_set(&self, key: PropertyKey) {
        let (balanced, fired) = {
            let mut state = self.inner.tracking.borrow_mut();
            let balanced = state.end_mutation(key);
            (balanced, state.invalidate(key))
        };
        if !balanced {
            invariant_violation(
                Some(self),
                format_args!("did_set for {key:?} without a matching will_set"),
            );
        }
        if !fired.is_empty() {
            tracing::trace!(?key, sessions = fired.len(), "property written, notifying sessions");
        }
        for callback in fired {
            callback();
        }
    }
}
