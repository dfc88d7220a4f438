//! Reconcile - Keyed diffing of ordered content.

pub mod keyed_diff;
pub mod keyed_node;

pub use keyed_diff::{KeyedDiff, Placement, diff_keys};
pub use keyed_node::{KeyedNode, KeyedPatchSummary};
