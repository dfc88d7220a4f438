//! Pipeline - From view descriptions to tree mutations.
//!
//! # Pipeline Architecture
//!
//! ```text
//! state write → tracking session fires → function node queued
//!             → transaction reruns nodes (shallowest first)
//!             → commit: container layout passes, then deferred actions
//! ```
//!
//! [`mount`] is the entry point that attaches a view to a tree node and
//! drives the first transaction.

pub mod mount;

pub use mount::{MountHandle, mount};
