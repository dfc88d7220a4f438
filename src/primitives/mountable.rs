//! Mountable - The protocol between view descriptions and mounted nodes.
//!
//! A view description (`Element`, `Text`, `ForEach`, a tuple...) is a
//! [`Mountable`]: it is consumed either to *make* a fresh mounted node or to
//! *patch* an existing one of the same type. The mounted node is a
//! [`MountedNode`] and lives until it is unmounted.
//!
//! Mounted nodes contribute their top-level tree nodes to the enclosing
//! container's layout pass through `collect_children`, in render order.
//!
//! # Lifecycle
//!
//! ```text
//! make_node ──► (patch_node | apply(Moved) | collect_children)* ──► unmount
//! ```
//!
//! `unmount` is called exactly once, after which the node is dropped.

use bitflags::bitflags;

use crate::engine::{CommitContext, ContainerHandle, LayoutPass, Transaction};

/// Structural operations delivered to a mounted node by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOp {
    /// The node's position among its siblings changed.
    Moved,
}

bitflags! {
    /// Reconciliation markers kept by element nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// The tree node exists and modifiers are mounted.
        const MOUNTED = 1 << 0;
        /// Repositioned since the last layout pass.
        const MOVED = 1 << 1;
        const UNMOUNTED = 1 << 2;
        /// Children need a layout pass.
        const CHILDREN_DIRTY = 1 << 3;
    }
}

/// Where a view is being mounted.
#[derive(Debug, Clone)]
pub struct ViewContext {
    function_depth: usize,
    container: ContainerHandle,
}

impl ViewContext {
    pub fn new(container: ContainerHandle) -> Self {
        Self {
            function_depth: 0,
            container,
        }
    }

    /// Number of function nodes enclosing this position.
    pub fn function_depth(&self) -> usize {
        self.function_depth
    }

    /// The container whose child list this view's nodes end up in.
    pub fn container(&self) -> &ContainerHandle {
        &self.container
    }

    /// Context for content produced by a function node at this position.
    pub fn nested_in_function(&self) -> Self {
        Self {
            function_depth: self.function_depth + 1,
            container: self.container.clone(),
        }
    }

    /// Context for content placed inside a new container.
    pub fn with_container(&self, container: ContainerHandle) -> Self {
        Self {
            function_depth: self.function_depth,
            container,
        }
    }
}

pub trait MountedNode: 'static {
    /// Report top-level tree nodes, in order, into `pass`.
    fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext);

    fn apply(&mut self, op: ReconcileOp, tx: &mut Transaction);

    /// Release everything this node owns. Called exactly once.
    fn unmount(&mut self, tx: &mut Transaction);
}

pub trait Mountable: Sized + 'static {
    type Node: MountedNode;

    fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> Self::Node;

    fn patch_node(self, node: &mut Self::Node, tx: &mut Transaction);
}
