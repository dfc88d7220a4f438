//! Keyed Node - An ordered, keyed collection of mounted nodes.
//!
//! `patch` takes the next key sequence and a callback that creates or patches
//! the node for one position. Retained nodes are patched in place, moved ones
//! receive [`ReconcileOp::Moved`] first, unmatched old ones are unmounted, and
//! the container is scheduled for layout only when the structure changed.

use std::fmt::Debug;
use std::hash::Hash;

use super::keyed_diff::{Placement, diff_keys};
use crate::diagnostics::invariant_violation;
use crate::engine::{CommitContext, ContainerHandle, LayoutPass, Transaction};
use crate::primitives::mountable::{MountedNode, ReconcileOp};

/// What one `patch` call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyedPatchSummary {
    pub created: usize,
    pub patched: usize,
    pub moved: usize,
    pub removed: usize,
    pub duplicates: usize,
}

impl KeyedPatchSummary {
    pub fn is_structural(&self) -> bool {
        self.created + self.moved + self.removed > 0
    }
}

pub struct KeyedNode<K, N> {
    entries: Vec<(K, N)>,
    container: ContainerHandle,
}

impl<K, N> KeyedNode<K, N>
where
    K: Hash + Eq + Clone + Debug + 'static,
    N: MountedNode,
{
    pub fn new(container: ContainerHandle) -> Self {
        Self {
            entries: Vec::new(),
            container,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn get(&self, key: &K) -> Option<&N> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, node)| node)
    }

    /// Reconcile to `keys`.
    ///
    /// `make_or_patch(index, slot, tx)` is called once per unique key, with
    /// `index` its position in `keys`. The slot is `None` for a new key and
    /// must be filled; otherwise it holds the retained node to patch.
    pub fn patch(
        &mut self,
        keys: Vec<K>,
        tx: &mut Transaction,
        mut make_or_patch: impl FnMut(usize, &mut Option<N>, &mut Transaction),
    ) -> KeyedPatchSummary {
        let old_keys: Vec<K> = self.entries.iter().map(|(key, _)| key.clone()).collect();
        let diff = diff_keys(&old_keys, &keys);
        let mut old_nodes: Vec<Option<N>> = std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(_, node)| Some(node))
            .collect();

        let mut summary = KeyedPatchSummary::default();
        let mut entries = Vec::with_capacity(keys.len());

        for (index, (key, placement)) in keys.into_iter().zip(&diff.placements).enumerate() {
            let mut slot = match *placement {
                Placement::Duplicate => {
                    summary.duplicates += 1;
                    continue;
                }
                Placement::Create => {
                    summary.created += 1;
                    None
                }
                Placement::Retain { from } => {
                    summary.patched += 1;
                    old_nodes[from].take()
                }
                Placement::Move { from } => {
                    summary.patched += 1;
                    summary.moved += 1;
                    let mut node = old_nodes[from].take();
                    if let Some(node) = node.as_mut() {
                        node.apply(ReconcileOp::Moved, tx);
                    }
                    node
                }
            };

            make_or_patch(index, &mut slot, tx);
            match slot {
                Some(node) => entries.push((key, node)),
                None => invariant_violation(
                    Some(tx.runtime()),
                    format_args!("keyed entry {key:?} was left without a mounted node"),
                ),
            }
        }

        for mut node in old_nodes.into_iter().flatten() {
            node.unmount(tx);
            summary.removed += 1;
        }

        self.entries = entries;
        if summary.is_structural() {
            tx.schedule_layout(&self.container);
        }
        tracing::trace!(?summary, "keyed content patched");
        summary
    }

    pub fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
        for (_, node) in &mut self.entries {
            node.collect_children(pass, ctx);
        }
    }

    pub fn apply(&mut self, op: ReconcileOp, tx: &mut Transaction) {
        for (_, node) in &mut self.entries {
            node.apply(op, tx);
        }
    }

    pub fn unmount(&mut self, tx: &mut Transaction) {
        for (_, mut node) in self.entries.drain(..) {
            node.unmount(tx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Runtime;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Counts {
        made: usize,
        patched: usize,
        moved: usize,
        unmounted: usize,
    }

    struct Probe {
        counts: Rc<RefCell<Counts>>,
        unmounted: bool,
    }

    impl MountedNode for Probe {
        fn collect_children(&mut self, _pass: &mut LayoutPass, _ctx: &mut CommitContext) {}

        fn apply(&mut self, op: ReconcileOp, _tx: &mut Transaction) {
            assert_eq!(op, ReconcileOp::Moved);
            self.counts.borrow_mut().moved += 1;
        }

        fn unmount(&mut self, _tx: &mut Transaction) {
            assert!(!self.unmounted, "unmounted twice");
            self.unmounted = true;
            self.counts.borrow_mut().unmounted += 1;
        }
    }

    fn patch_with(
        keyed: &mut KeyedNode<&'static str, Probe>,
        keys: &[&'static str],
        counts: &Rc<RefCell<Counts>>,
        tx: &mut Transaction,
    ) -> KeyedPatchSummary {
        keyed.patch(keys.to_vec(), tx, |_, slot, _| match slot {
            Some(_) => counts.borrow_mut().patched += 1,
            None => {
                counts.borrow_mut().made += 1;
                *slot = Some(Probe {
                    counts: counts.clone(),
                    unmounted: false,
                });
            }
        })
    }

    #[test]
    fn test_swap_is_one_move_without_recreation() {
        let rt = Runtime::new();
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut keyed = KeyedNode::new(ContainerHandle::detached());

        rt.transaction(|tx| {
            patch_with(&mut keyed, &["A", "B", "C"], &counts, tx);
            *counts.borrow_mut() = Counts::default();

            let summary = patch_with(&mut keyed, &["B", "A", "C"], &counts, tx);
            assert_eq!(summary.moved, 1);
        })
        .unwrap();

        let counts = counts.borrow();
        assert_eq!((counts.made, counts.unmounted, counts.moved), (0, 0, 1));
        assert_eq!(counts.patched, 3);
        assert_eq!(keyed.keys().copied().collect::<Vec<_>>(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_same_keys_twice_is_not_structural() {
        let rt = Runtime::new();
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut keyed = KeyedNode::new(ContainerHandle::detached());

        rt.transaction(|tx| {
            patch_with(&mut keyed, &["x", "y"], &counts, tx);
            let summary = patch_with(&mut keyed, &["x", "y"], &counts, tx);
            assert!(!summary.is_structural());
            assert_eq!(summary.patched, 2);
        })
        .unwrap();
    }

    #[test]
    fn test_removed_entries_unmount_once() {
        let rt = Runtime::new();
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut keyed = KeyedNode::new(ContainerHandle::detached());

        rt.transaction(|tx| {
            patch_with(&mut keyed, &["a", "b", "c"], &counts, tx);
            let summary = patch_with(&mut keyed, &["c"], &counts, tx);
            assert_eq!(summary.removed, 2);
            keyed.unmount(tx);
        })
        .unwrap();

        assert_eq!(counts.borrow().unmounted, 3);
        assert!(keyed.is_empty());
    }

    #[test]
    fn test_duplicate_keys_mount_first_only() {
        let rt = Runtime::new();
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut keyed = KeyedNode::new(ContainerHandle::detached());

        rt.transaction(|tx| {
            let summary = patch_with(&mut keyed, &["a", "a", "b"], &counts, tx);
            assert_eq!(summary.duplicates, 1);
        })
        .unwrap();

        assert_eq!(counts.borrow().made, 2);
        assert_eq!(keyed.len(), 2);
        assert!(keyed.get(&"b").is_some());
    }
}
