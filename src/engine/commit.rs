//! Commit - Applying accumulated structural work to the node tree.
//!
//! During reruns, nodes only record *what* changed: a container marks itself
//! dirty with `Transaction::schedule_layout`, and side effects that must touch
//! the tree are deferred with `Transaction::defer_commit`.
//!
//! At commit, every dirty container runs a layout pass: its mounted content
//! reports its current top-level node ids in order ([`LayoutPass`]), and
//! [`apply_children`] reconciles the tree's child list to that order with the
//! keyed diff, keyed by node id.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use taffy::NodeId;

use super::runtime::Runtime;
use crate::error::Result;
use crate::reconcile::keyed_diff::{Placement, diff_keys};
use crate::renderer::NodeTree;

// =============================================================================
// COMMIT CONTEXT
// =============================================================================

/// Access to the tree and runtime while committing.
pub struct CommitContext {
    runtime: Runtime,
    tree: NodeTree,
}

impl CommitContext {
    pub(crate) fn new(runtime: Runtime) -> Self {
        let tree = runtime.node_tree().clone();
        Self { runtime, tree }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }
}

/// Ordered collection of the top-level node ids a container currently shows.
#[derive(Debug, Default)]
pub struct LayoutPass {
    children: Vec<NodeId>,
}

impl LayoutPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeId) {
        self.children.push(node);
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

// =============================================================================
// CONTAINERS
// =============================================================================

/// Anything that owns a child list in the node tree.
pub(crate) trait Container {
    fn reconcile_children(&mut self, ctx: &mut CommitContext) -> Result<()>;
}

struct NoContainer;

impl Container for NoContainer {
    fn reconcile_children(&mut self, _ctx: &mut CommitContext) -> Result<()> {
        Ok(())
    }
}

/// Weak handle to a container, used to schedule its layout pass.
#[derive(Clone)]
pub struct ContainerHandle(Weak<RefCell<dyn Container>>);

impl ContainerHandle {
    pub(crate) fn new<C: Container + 'static>(container: &Rc<RefCell<C>>) -> Self {
        let container: Rc<RefCell<dyn Container>> = container.clone();
        Self(Rc::downgrade(&container))
    }

    /// A handle that refers to nothing. Scheduling its layout is a no-op.
    pub fn detached() -> Self {
        let weak: Weak<RefCell<dyn Container>> = Weak::<RefCell<NoContainer>>::new();
        Self(weak)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn addr(&self) -> usize {
        self.0.as_ptr() as *const () as usize
    }

    pub(crate) fn reconcile(&self, ctx: &mut CommitContext) -> Result<()> {
        match self.0.upgrade() {
            Some(container) => container.borrow_mut().reconcile_children(ctx),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContainerHandle").field(&self.addr()).finish()
    }
}

// =============================================================================
// CHILD LIST RECONCILIATION
// =============================================================================

/// Counts of tree operations performed by [`apply_children`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChildrenPatch {
    pub inserted: usize,
    pub moved: usize,
    pub removed: usize,
}

/// Make `parent`'s children exactly `desired`, in order.
///
/// Nodes in the longest stable subsequence stay put; only the rest are
/// inserted or moved, walking right to left so each lands before its already
/// placed successor.
pub fn apply_children(tree: &NodeTree, parent: NodeId, desired: &[NodeId]) -> Result<ChildrenPatch> {
    let current = tree.children(parent)?;
    let mut patch = ChildrenPatch::default();
    if current == desired {
        return Ok(patch);
    }

    let diff = diff_keys(&current, desired);
    for &index in &diff.removed {
        tree.remove_child(parent, current[index])?;
        patch.removed += 1;
    }

    let mut anchor = None;
    for (node, placement) in desired.iter().zip(&diff.placements).rev() {
        match placement {
            Placement::Duplicate => continue,
            Placement::Retain { .. } => {}
            Placement::Create => {
                tree.insert_before(parent, *node, anchor)?;
                patch.inserted += 1;
            }
            Placement::Move { .. } => {
                tree.insert_before(parent, *node, anchor)?;
                patch.moved += 1;
            }
        }
        anchor = Some(*node);
    }

    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Mutation;

    fn tree_with_children(count: usize) -> (NodeTree, NodeId, Vec<NodeId>) {
        let tree = NodeTree::new();
        let parent = tree.create_element("div").unwrap();
        let children: Vec<_> = (0..count)
            .map(|i| tree.create_text(&i.to_string()).unwrap())
            .collect();
        for &child in &children {
            tree.insert_before(parent, child, None).unwrap();
        }
        tree.take_mutations();
        (tree, parent, children)
    }

    #[test]
    fn test_unchanged_children_touch_nothing() {
        let (tree, parent, children) = tree_with_children(3);

        let patch = apply_children(&tree, parent, &children).unwrap();

        assert_eq!(patch, ChildrenPatch::default());
        assert!(tree.take_mutations().is_empty());
    }

    #[test]
    fn test_swap_first_two_moves_one_node() {
        let (tree, parent, c) = tree_with_children(3);

        let patch = apply_children(&tree, parent, &[c[1], c[0], c[2]]).unwrap();

        assert_eq!(patch, ChildrenPatch { inserted: 0, moved: 1, removed: 0 });
        assert_eq!(tree.children(parent).unwrap(), vec![c[1], c[0], c[2]]);
        assert_eq!(
            tree.take_mutations(),
            vec![Mutation::Move { parent, child: c[0], index: 1 }]
        );
    }

    #[test]
    fn test_mixed_insert_remove_and_move() {
        let (tree, parent, c) = tree_with_children(4);
        let fresh = tree.create_text("new").unwrap();

        let desired = [c[3], fresh, c[1], c[2]];
        let patch = apply_children(&tree, parent, &desired).unwrap();

        assert_eq!(tree.children(parent).unwrap(), desired.to_vec());
        assert_eq!(patch.removed, 1);
        assert_eq!(patch.inserted, 1);
        assert_eq!(patch.moved, 1);
    }

    #[test]
    fn test_detached_handle_reconciles_nothing() {
        let rt = Runtime::new();
        let handle = ContainerHandle::detached();
        let mut ctx = CommitContext::new(rt);

        assert!(!handle.is_alive());
        handle.reconcile(&mut ctx).unwrap();
    }
}
