//! Engine - Runtime, function node graph and transaction scheduler.
//!
//! The engine owns everything that decides *when* work happens:
//! - Runtime: per-UI context holding tracking, scheduler and node tree state
//! - FunctionNode: the id/depth/rerun view of a reactive node
//! - Scheduler: transactions that rerun invalidated nodes shallowest first
//! - Commit: container layout passes and deferred actions applied to the tree
//!
//! # Architecture
//!
//! ```text
//! state write ──► did_set ──► session fires ──► invalidate_function
//!                                                     │
//!                   ┌─────────── transaction ─────────┘
//!                   ▼
//!      drain pending nodes by (depth, sequence)
//!                   │ reruns schedule layouts / defer commit actions
//!                   ▼
//!      commit: layout passes, then actions (FIFO) ──► NodeTree
//! ```

mod registry;
mod runtime;
mod function_node;
mod scheduler;
pub mod commit;

pub use runtime::{Runtime, WeakRuntime};
pub use function_node::{AnyFunctionNode, FunctionNodeId, invalidation_hook};
pub use scheduler::Transaction;
pub use commit::{ChildrenPatch, CommitContext, ContainerHandle, LayoutPass, apply_children};
