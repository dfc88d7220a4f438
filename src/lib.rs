//! # spark-ui
//!
//! Reactive, declarative UI core for Rust.
//!
//! Views are plain values. Mounting one builds a tree of mounted nodes that
//! render into an abstract node tree ([`renderer::NodeTree`], backed by taffy).
//! State cells record who reads them; writing a cell reruns exactly the parts
//! of the view that read it, batched into a transaction whose structural
//! changes are committed to the tree in one go.
//!
//! ## Architecture
//!
//! ```text
//! StateCell::set ──► tracking session fires ──► function node queued
//!      ──► transaction: reruns (shallowest first), keyed diffs
//!      ──► commit: container layout passes, deferred actions ──► NodeTree
//! ```
//!
//! ## Modules
//!
//! - [`reactive`] - Registrars, tracking sessions, state cells, bindings, effects
//! - [`engine`] - Runtime, function nodes, transaction scheduler, commit
//! - [`reconcile`] - Keyed diff with minimal moves
//! - [`primitives`] - The mountable protocol and the built-in views
//! - [`state`] - Focus and input value bindings
//! - [`renderer`] - The node tree target and its accessors
//! - [`pipeline`] - Mounting views
//! - [`animation`] - Animatable vector conversions
//!
//! ## Example
//!
//! ```ignore
//! use spark_ui::{Runtime, StateCell, mount};
//! use spark_ui::primitives::{dyn_text, each, element};
//!
//! let runtime = Runtime::new();
//! let root = runtime.node_tree().create_element("body")?;
//! let todos = StateCell::new(&runtime, vec!["write", "ship"]);
//!
//! let items = todos.clone();
//! let handle = mount(&runtime, root, element("ul", each(
//!     move || items.get(),
//!     |todo| *todo,
//!     |todo| element("li", *todo),
//! )))?;
//!
//! todos.set(vec!["ship", "write"]); // one move, nothing recreated
//! ```

pub mod animation;
pub mod config;
mod diagnostics;
pub mod engine;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod pipeline;
pub mod primitives;
pub mod reactive;
pub mod reconcile;
pub mod renderer;
pub mod state;

// Re-export commonly used items
pub use config::{DEFAULT_MAX_RERUNS_PER_NODE, InvariantPolicy, RuntimeConfig};
pub use error::{Error, Result};

pub use engine::{Runtime, Transaction, WeakRuntime};

pub use reactive::{Binding, EffectHandle, Registrar, StateCell, TrackingSession, ViewStateStorage};

pub use reconcile::{KeyedDiff, Placement, diff_keys};

pub use primitives::{Mountable, MountedNode, dyn_text, each, element, group, show, text};

pub use state::{FocusBinding, FocusState};

pub use renderer::{Mutation, NodeTree};

pub use pipeline::{MountHandle, mount};

#[cfg(feature = "logging")]
pub use logging::init_tracing;
