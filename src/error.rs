//! Error types for the reactive core.
//!
//! Programmer misuse (double focus bindings, rebinding storage, duplicate keys)
//! is reported through [`crate::diagnostics`] and never surfaces as an
//! [`Error`]. Only failures a caller can meaningfully react to end up here.

use taffy::NodeId;

use crate::engine::FunctionNodeId;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A function node kept invalidating itself within one transaction.
    #[error(
        "function node {node:?} at depth {depth} reran more than {limit} times in one transaction"
    )]
    RerunLimitExceeded {
        node: FunctionNodeId,
        depth: usize,
        limit: usize,
    },

    /// The underlying node tree storage rejected an operation.
    #[error("node tree error: {0}")]
    NodeTree(#[from] taffy::TaffyError),

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// An animatable vector was converted into a value of a different arity.
    #[error("animatable vector has {found} components, expected {expected}")]
    VectorArity { expected: usize, found: usize },

    #[error("the runtime owning this handle has been dropped")]
    RuntimeDropped,
}
