//! Scheduler - Transactions over the function node graph.
//!
//! A transaction collects every invalidated function node, reruns them
//! shallowest first, then commits all accumulated structural work in one pass:
//!
//! 1. **Drain**: pop the pending node with the smallest `(depth, sequence)` and
//!    rerun it. Reruns may enqueue more nodes; those are drained too. A node is
//!    pending at most once at a time.
//! 2. **Commit**: reconcile every dirty container's children against the node
//!    tree, then run deferred commit actions in FIFO order.
//! 3. Repeat while the commit produced new work.
//!
//! A node rerunning more than `max_reruns_per_node` times in one transaction is
//! treated as a runaway cycle: that node is stopped (its later invalidations in
//! the transaction are skipped and it holds no armed session afterwards), every
//! other pending node still reruns, the accumulated work is committed, and the
//! transaction returns [`Error::RerunLimitExceeded`]. A stopped node runs again
//! only when it is invalidated explicitly, e.g. by its owner being patched.
//!
//! Transactions nest by folding: opening one while another is active just runs
//! the closure inside the outer transaction.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::commit::{CommitContext, ContainerHandle};
use super::function_node::{AnyFunctionNode, FunctionNodeId};
use super::runtime::Runtime;
use crate::error::{Error, Result};

type CommitAction = Box<dyn FnOnce(&mut CommitContext)>;

// =============================================================================
// SCHEDULER STATE
// =============================================================================

#[derive(Default)]
pub(crate) struct SchedulerState {
    active: bool,
    sequence: u64,
    pending: BTreeMap<(usize, u64), AnyFunctionNode>,
    queued: HashMap<FunctionNodeId, (usize, u64)>,
    reruns: HashMap<FunctionNodeId, usize>,
    layouts: Vec<ContainerHandle>,
    layout_set: HashSet<usize>,
    actions: Vec<CommitAction>,
}

struct CommitWork {
    layouts: Vec<ContainerHandle>,
    actions: Vec<CommitAction>,
}

impl CommitWork {
    fn is_empty(&self) -> bool {
        self.layouts.is_empty() && self.actions.is_empty()
    }
}

impl SchedulerState {
    /// Returns false if the node was already pending.
    fn enqueue(&mut self, node: &AnyFunctionNode) -> bool {
        if self.queued.contains_key(&node.id()) {
            return false;
        }
        self.sequence += 1;
        let slot = (node.depth(), self.sequence);
        self.queued.insert(node.id(), slot);
        self.pending.insert(slot, node.clone());
        true
    }

    fn dequeue(&mut self, id: FunctionNodeId) -> Option<AnyFunctionNode> {
        let slot = self.queued.remove(&id)?;
        self.pending.remove(&slot)
    }

    fn pop_next(&mut self) -> Option<AnyFunctionNode> {
        let (_, node) = self.pending.pop_first()?;
        self.queued.remove(&node.id());
        Some(node)
    }

    fn count_rerun(&mut self, id: FunctionNodeId) -> usize {
        let count = self.reruns.entry(id).or_insert(0);
        *count += 1;
        *count
    }

    fn schedule_layout(&mut self, container: &ContainerHandle) {
        if self.layout_set.insert(container.addr()) {
            self.layouts.push(container.clone());
        }
    }

    fn take_commit_work(&mut self) -> CommitWork {
        self.layout_set.clear();
        CommitWork {
            layouts: std::mem::take(&mut self.layouts),
            actions: std::mem::take(&mut self.actions),
        }
    }

    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// =============================================================================
// TRANSACTION HANDLE
// =============================================================================

/// Handle passed to every make, patch, rerun and unmount.
///
/// All work registered through it lands in the runtime's active transaction.
pub struct Transaction {
    runtime: Runtime,
}

impl Transaction {
    pub(crate) fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Mark a function node for rerun in this transaction.
    pub fn add_function(&mut self, node: &AnyFunctionNode) {
        self.runtime.inner.scheduler.borrow_mut().enqueue(node);
    }

    /// Drop a pending rerun, typically because the node is being unmounted.
    pub fn cancel_function(&mut self, id: FunctionNodeId) {
        let removed = self.runtime.inner.scheduler.borrow_mut().dequeue(id);
        drop(removed);
    }

    /// Queue a children reconciliation for `container` at commit.
    pub fn schedule_layout(&mut self, container: &ContainerHandle) {
        self.runtime
            .inner
            .scheduler
            .borrow_mut()
            .schedule_layout(container);
    }

    /// Run `action` during commit, after container layout passes.
    pub fn defer_commit(&mut self, action: impl FnOnce(&mut CommitContext) + 'static) {
        self.runtime
            .inner
            .scheduler
            .borrow_mut()
            .actions
            .push(Box::new(action));
    }
}

// =============================================================================
// RUNTIME TRANSACTION API
// =============================================================================

/// Resets the active flag even if a rerun panics.
struct ActiveGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.runtime.inner.scheduler.try_borrow_mut() {
            state.active = false;
            state.reruns.clear();
        }
    }
}

impl Runtime {
    pub fn in_transaction(&self) -> bool {
        self.inner.scheduler.borrow().active
    }

    /// Number of function nodes waiting to rerun.
    pub fn pending_functions(&self) -> usize {
        self.inner.scheduler.borrow().pending_len()
    }

    /// Withdraw a pending rerun of `id`, if any.
    pub(crate) fn cancel_pending(&self, id: FunctionNodeId) {
        let removed = self.inner.scheduler.borrow_mut().dequeue(id);
        drop(removed);
    }

    /// Run `f` inside a transaction and settle it before returning.
    ///
    /// Inside an active transaction this folds into the outer one and always
    /// returns `Ok`; errors surface from the outermost call.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Transaction) -> R) -> Result<R> {
        let (value, outcome) = self.run_transaction(f);
        outcome.map(|()| value)
    }

    /// Group several state writes so dependents rerun once.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        self.transaction(|_| f())
    }

    /// Post `node` for rerun. Outside a transaction one is opened and settled.
    pub fn invalidate_function(&self, node: &AnyFunctionNode) {
        let (newly_queued, active) = {
            let mut state = self.inner.scheduler.borrow_mut();
            (state.enqueue(node), state.active)
        };
        if newly_queued && !active {
            let ((), outcome) = self.run_transaction(|_| ());
            if let Err(error) = outcome {
                tracing::error!(%error, "implicit transaction failed");
            }
        }
    }

    /// Run a state write, opening an implicit transaction if none is active.
    pub(crate) fn write<R>(&self, f: impl FnOnce() -> R) -> R {
        let (value, outcome) = self.run_transaction(|_| f());
        if let Err(error) = outcome {
            tracing::error!(%error, "transaction opened by a state write failed");
        }
        value
    }

    pub(crate) fn run_transaction<R>(&self, f: impl FnOnce(&mut Transaction) -> R) -> (R, Result<()>) {
        let mut tx = Transaction::new(self.clone());
        let nested = {
            let mut state = self.inner.scheduler.borrow_mut();
            std::mem::replace(&mut state.active, true)
        };
        if nested {
            return (f(&mut tx), Ok(()));
        }

        let _guard = ActiveGuard { runtime: self };
        let value = f(&mut tx);
        let outcome = self.settle(&mut tx);
        (value, outcome)
    }

    fn settle(&self, tx: &mut Transaction) -> Result<()> {
        let limit = self.inner.config.max_reruns_per_node;
        let mut failure = None;

        loop {
            if let Err(error) = self.drain(tx, limit) {
                failure.get_or_insert(error);
            }

            let work = self.inner.scheduler.borrow_mut().take_commit_work();
            if work.is_empty() {
                break;
            }
            self.commit(work);
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Rerun pending nodes until none is left. Nodes over the rerun limit are
    /// skipped; the first one to cross it is reported.
    fn drain(&self, tx: &mut Transaction, limit: usize) -> Result<()> {
        let mut failure = None;
        loop {
            let next = self.inner.scheduler.borrow_mut().pop_next();
            let Some(node) = next else {
                break;
            };

            let runs = self.inner.scheduler.borrow_mut().count_rerun(node.id());
            if runs > limit {
                if runs == limit + 1 {
                    tracing::error!(
                        node = ?node.id(),
                        depth = node.depth(),
                        limit,
                        "function node keeps invalidating itself, stopping it"
                    );
                    failure.get_or_insert(Error::RerunLimitExceeded {
                        node: node.id(),
                        depth: node.depth(),
                        limit,
                    });
                }
                continue;
            }

            tracing::trace!(node = ?node.id(), depth = node.depth(), run = runs, "rerunning function node");
            node.run(tx);
        }
        failure.map_or(Ok(()), Err)
    }

    fn commit(&self, work: CommitWork) {
        tracing::trace!(
            layouts = work.layouts.len(),
            actions = work.actions.len(),
            "committing"
        );
        let mut ctx = CommitContext::new(self.clone());
        for container in work.layouts {
            if let Err(error) = container.reconcile(&mut ctx) {
                tracing::error!(%error, "container layout pass failed");
            }
        }
        for action in work.actions {
            action(&mut ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::RuntimeConfig;
    use crate::reactive::StateCell;

    #[test]
    fn test_pending_is_ordered_by_depth_then_sequence() {
        let rt = Runtime::new();
        let mut state = SchedulerState::default();
        let deep = AnyFunctionNode::new(&rt, 2, |_| {});
        let shallow = AnyFunctionNode::new(&rt, 0, |_| {});
        let middle_a = AnyFunctionNode::new(&rt, 1, |_| {});
        let middle_b = AnyFunctionNode::new(&rt, 1, |_| {});

        for node in [&deep, &middle_a, &shallow, &middle_b] {
            assert!(state.enqueue(node));
        }
        assert!(!state.enqueue(&deep));

        let order: Vec<_> = std::iter::from_fn(|| state.pop_next()).map(|n| n.id()).collect();
        assert_eq!(order, vec![shallow.id(), middle_a.id(), middle_b.id(), deep.id()]);
    }

    #[test]
    fn test_dequeue_removes_pending_node() {
        let rt = Runtime::new();
        let mut state = SchedulerState::default();
        let node = AnyFunctionNode::new(&rt, 0, |_| {});
        state.enqueue(&node);

        assert!(state.dequeue(node.id()).is_some());
        assert!(state.pop_next().is_none());
        assert!(state.enqueue(&node));
    }

    #[test]
    fn test_nested_transactions_fold() {
        let rt = Runtime::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        let inner_rt = rt.clone();
        rt.transaction(|_| {
            log.borrow_mut().push(inner_rt.in_transaction());
            inner_rt
                .transaction(|_| log.borrow_mut().push(inner_rt.in_transaction()))
                .unwrap();
        })
        .unwrap();

        assert_eq!(*seen.borrow(), vec![true, true]);
        assert!(!rt.in_transaction());
    }

    #[test]
    fn test_commit_actions_run_in_order_after_reruns() {
        let rt = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let node_log = log.clone();
        let node = AnyFunctionNode::new(&rt, 0, move |tx| {
            node_log.borrow_mut().push("rerun");
            let first = node_log.clone();
            tx.defer_commit(move |_| first.borrow_mut().push("commit 1"));
            let second = node_log.clone();
            tx.defer_commit(move |_| second.borrow_mut().push("commit 2"));
        });

        rt.transaction(|tx| tx.add_function(&node)).unwrap();

        assert_eq!(*log.borrow(), vec!["rerun", "commit 1", "commit 2"]);
    }

    #[test]
    fn test_commit_work_can_schedule_more_reruns() {
        let rt = Runtime::new();
        let runs = Rc::new(RefCell::new(0));

        let counter = runs.clone();
        let follow_up = AnyFunctionNode::new(&rt, 0, move |_| *counter.borrow_mut() += 1);
        let trigger = follow_up.clone();
        rt.transaction(|tx| {
            tx.defer_commit(move |ctx| ctx.runtime().invalidate_function(&trigger));
        })
        .unwrap();

        assert_eq!(*runs.borrow(), 1);
    }

    #[test]
    fn test_runaway_node_is_stopped() {
        let rt = Runtime::with_config(RuntimeConfig::default().with_max_reruns_per_node(5));
        let cell = StateCell::new(&rt, 0u32);
        let committed = Rc::new(RefCell::new(false));

        let counter = cell.clone();
        let effect = rt.effect(move || {
            let value = counter.get();
            if value >= 100 {
                counter.set(value + 1);
            }
        });

        let flag = committed.clone();
        let result = rt.transaction(|tx| {
            tx.defer_commit(move |_| *flag.borrow_mut() = true);
            cell.set(100);
        });

        assert!(matches!(result, Err(Error::RerunLimitExceeded { limit: 5, .. })));
        assert!(*committed.borrow());
        assert!(!rt.in_transaction());
        assert_eq!(rt.pending_functions(), 0);
        drop(effect);
    }

    #[test]
    fn test_runaway_node_does_not_stop_other_nodes() {
        let rt = Runtime::with_config(RuntimeConfig::default().with_max_reruns_per_node(10));
        let loopy = StateCell::new(&rt, 0u32);
        let other = StateCell::new(&rt, 0u32);
        let other_runs = Rc::new(RefCell::new(0));

        let counter = loopy.clone();
        let runaway = rt.effect_at(0, move || {
            let value = counter.get();
            if value > 0 {
                counter.set(value + 1);
            }
        });
        let (reader, runs) = (other.clone(), other_runs.clone());
        let unrelated = rt.effect_at(5, move || {
            reader.get();
            *runs.borrow_mut() += 1;
        });

        let result = rt.batch(|| {
            other.set(1);
            loopy.set(1);
        });
        assert!(matches!(result, Err(Error::RerunLimitExceeded { depth: 0, .. })));
        assert_eq!(*other_runs.borrow(), 2);

        other.set(2);
        other.set(3);

        assert_eq!(*other_runs.borrow(), 4);
        assert_eq!(rt.observer_count(loopy.key()), 0);
        drop((runaway, unrelated));
    }

    #[test]
    fn test_stopped_node_runs_again_when_invalidated_explicitly() {
        let rt = Runtime::with_config(RuntimeConfig::default().with_max_reruns_per_node(3));
        let runs = Rc::new(RefCell::new(0));

        let counter = runs.clone();
        let node = Rc::new(RefCell::new(None::<AnyFunctionNode>));
        let slot = node.clone();
        let looping = AnyFunctionNode::new(&rt, 0, move |tx| {
            *counter.borrow_mut() += 1;
            if let Some(me) = slot.borrow().as_ref() {
                tx.add_function(me);
            }
        });
        *node.borrow_mut() = Some(looping.clone());

        let result = rt.transaction(|tx| tx.add_function(&looping));
        assert!(matches!(result, Err(Error::RerunLimitExceeded { limit: 3, .. })));
        assert_eq!(*runs.borrow(), 3);

        node.borrow_mut().take();
        rt.invalidate_function(&looping);
        assert_eq!(*runs.borrow(), 4);
    }
}
