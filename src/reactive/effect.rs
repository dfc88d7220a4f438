//! Effects - Function nodes that run side effects when their reads change.
//!
//! An effect is the smallest function node: each run records what it reads,
//! and the next write to any of those reads schedules another run in the
//! current (or a fresh) transaction. Effects run once at creation.
//!
//! Dropping the [`EffectHandle`] disposes the effect: its session is
//! cancelled and any pending rerun is withdrawn.
//!
//! # Example
//!
//! ```ignore
//! let count = StateCell::new(&runtime, 0);
//! let seen = count.clone();
//! let _log = runtime.effect(move || tracing::info!(count = seen.get(), "count changed"));
//!
//! let _changes = runtime.on_change(
//!     { let count = count.clone(); move || count.get() },
//!     |old, new| tracing::info!(old, new, "transition"),
//! );
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::tracking::TrackingSession;
use crate::engine::{AnyFunctionNode, Runtime, Transaction, WeakRuntime, invalidation_hook};

struct EffectState {
    body: Box<dyn FnMut(&mut Transaction)>,
    session: Option<TrackingSession>,
    function: AnyFunctionNode,
    disposed: bool,
}

impl EffectState {
    fn run(state: &Rc<RefCell<Self>>, tx: &mut Transaction) {
        let mut this = state.borrow_mut();
        if this.disposed {
            return;
        }
        drop(this.session.take());

        let runtime = tx.runtime().clone();
        let hook = invalidation_hook(&runtime, &this.function);
        let body = &mut this.body;
        let ((), session) = runtime.track(|| body(tx), hook);
        this.session = Some(session);
    }
}

/// Owning handle of an effect. Dropping it stops the effect.
#[must_use = "dropping an EffectHandle stops the effect"]
pub struct EffectHandle {
    state: Rc<RefCell<EffectState>>,
    runtime: WeakRuntime,
}

impl EffectHandle {
    pub fn is_active(&self) -> bool {
        self.state.try_borrow().map_or(true, |s| !s.disposed)
    }

    pub fn dispose(self) {}
}

impl Drop for EffectHandle {
    fn drop(&mut self) {
        let (session, id) = match self.state.try_borrow_mut() {
            Ok(mut state) => {
                state.disposed = true;
                (state.session.take(), state.function.id())
            }
            Err(_) => {
                tracing::warn!("effect handle dropped while its effect was running");
                return;
            }
        };
        drop(session);
        if let Some(rt) = self.runtime.upgrade() {
            rt.cancel_pending(id);
        }
    }
}

impl Runtime {
    /// Run `body` now and again whenever something it read changes.
    pub fn effect(&self, mut body: impl FnMut() + 'static) -> EffectHandle {
        self.effect_with(0, move |_| body())
    }

    /// Like [`Runtime::effect`], scheduled at `depth` relative to other function nodes.
    pub fn effect_at(&self, depth: usize, mut body: impl FnMut() + 'static) -> EffectHandle {
        self.effect_with(depth, move |_| body())
    }

    /// Effect whose body receives the transaction, so it can defer commit work.
    pub fn effect_with(
        &self,
        depth: usize,
        body: impl FnMut(&mut Transaction) + 'static,
    ) -> EffectHandle {
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<EffectState>>| {
            let weak = weak.clone();
            let function = AnyFunctionNode::new(self, depth, move |tx| {
                if let Some(state) = weak.upgrade() {
                    EffectState::run(&state, tx);
                }
            });
            RefCell::new(EffectState {
                body: Box::new(body),
                session: None,
                function,
                disposed: false,
            })
        });

        let function = state.borrow().function.clone();
        self.invalidate_function(&function);

        EffectHandle {
            state,
            runtime: self.downgrade(),
        }
    }

    /// Call `action(old, new)` whenever the value produced by `value` changes.
    ///
    /// `action` runs untracked; only `value` decides when this reruns.
    pub fn on_change<T: Clone + PartialEq + 'static>(
        &self,
        value: impl Fn() -> T + 'static,
        mut action: impl FnMut(&T, &T) + 'static,
    ) -> EffectHandle {
        let mut previous: Option<T> = None;
        self.effect_with(0, move |tx| {
            let current = value();
            if let Some(old) = previous.replace(current.clone()) {
                if old != current {
                    tx.runtime().untracked(|| action(&old, &current));
                }
            }
        })
    }
}
