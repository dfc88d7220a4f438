//! Function Nodes - The scheduler-facing face of reactive view nodes.
//!
//! A function node is anything that recomputes when its dependencies change:
//! a `ForEach`, a conditional, dynamic text, an effect. The scheduler only
//! sees an [`AnyFunctionNode`]: a stable id, the depth in the view tree, and a
//! closure that reruns the node inside a transaction.
//!
//! The closure holds the node state weakly. Once the state is dropped, a
//! pending rerun becomes a no-op.
//!
//! # Example
//!
//! ```ignore
//! let state = Rc::new_cyclic(|weak: &Weak<RefCell<MyState>>| {
//!     let weak = weak.clone();
//!     let function = AnyFunctionNode::new(&runtime, depth, move |tx| {
//!         if let Some(state) = weak.upgrade() {
//!             MyState::run(&state, tx);
//!         }
//!     });
//!     RefCell::new(MyState { function, session: None })
//! });
//! ```

use std::fmt;
use std::rc::Rc;

use super::runtime::Runtime;
use super::scheduler::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionNodeId(u64);

#[derive(Clone)]
pub struct AnyFunctionNode {
    id: FunctionNodeId,
    depth: usize,
    run: Rc<dyn Fn(&mut Transaction)>,
}

impl AnyFunctionNode {
    pub fn new(runtime: &Runtime, depth: usize, run: impl Fn(&mut Transaction) + 'static) -> Self {
        Self {
            id: FunctionNodeId(runtime.next_id()),
            depth,
            run: Rc::new(run),
        }
    }

    pub fn id(&self) -> FunctionNodeId {
        self.id
    }

    /// Nesting depth in the view tree. Shallower nodes rerun first.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn run(&self, tx: &mut Transaction) {
        (self.run)(tx)
    }
}

impl fmt::Debug for AnyFunctionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyFunctionNode")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Build the invalidation callback that posts `node` back to the scheduler.
///
/// Installed as the `on_invalidate` hook of the node's tracking session.
pub fn invalidation_hook(runtime: &Runtime, node: &AnyFunctionNode) -> impl FnOnce() + 'static {
    let runtime = runtime.downgrade();
    let node = node.clone();
    move || {
        if let Some(runtime) = runtime.upgrade() {
            runtime.invalidate_function(&node);
        }
    }
}
