//! UI Primitives - View building blocks.
//!
//! This module provides the core UI primitives:
//! - [`element`] - Tagged container node with layout style and modifiers
//! - [`text`] / [`dyn_text`] - Static and reactive text
//! - [`show`] / [`each`] - Conditional and keyed list rendering
//! - tuples and [`group`] - Several views side by side
//!
//! # Architecture
//!
//! Views are plain values describing what to render. Mounting consumes a
//! view and produces a mounted node; rendering again with a view of the same
//! type patches that node in place instead of recreating it.
//!
//! ```ignore
//! let view = element("section", (
//!     element("h1", text("Todos")),
//!     show(move || list.get().is_empty(), || text("Nothing to do"), None::<fn() -> Text>),
//! ));
//! ```

pub mod mountable;

mod control_flow;
mod element;
mod group;
mod text;

pub use control_flow::{ForEach, ForEachNode, Show, ShowNode, each, show};
pub use element::{Element, ElementModifier, ElementNode, element};
pub(crate) use element::ElementState;
pub use group::{Group, GroupNode, group};
pub use mountable::{Mountable, MountedNode, NodeFlags, ReconcileOp, ViewContext};
pub use text::{DynText, DynTextNode, Text, TextNode, dyn_text, text};
