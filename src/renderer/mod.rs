//! Renderer - The node tree target and the accessors modifiers use on it.

pub mod accessors;
pub mod node_tree;

pub use accessors::{FocusAccessor, ValueAccessor};
pub use node_tree::{FocusEvent, Mutation, NodeData, NodeKind, NodeTree};
pub use taffy::NodeId;
