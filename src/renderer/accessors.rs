//! Accessors - Handles that let modifiers drive a node and hear its events.
//!
//! An accessor installs one listener on its node when created and removes it
//! when dropped. Dropping the accessor is how a modifier tears down.

use std::rc::Rc;

use taffy::NodeId;

use super::node_tree::{FocusEvent, ListenerId, NodeTree};
use crate::error::Result;

/// Focus/blur control over one node, plus a focus event listener.
pub struct FocusAccessor {
    tree: NodeTree,
    node: NodeId,
    listener: ListenerId,
}

impl FocusAccessor {
    pub fn new(
        tree: &NodeTree,
        node: NodeId,
        on_event: impl Fn(FocusEvent) + 'static,
    ) -> Result<Self> {
        let listener = tree.add_focus_listener(node, Rc::new(on_event))?;
        Ok(Self {
            tree: tree.clone(),
            node,
            listener,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn focus(&self) {
        if let Err(error) = self.tree.focus(self.node) {
            tracing::warn!(node = ?self.node, %error, "focus request on a missing node");
        }
    }

    pub fn blur(&self) {
        if let Err(error) = self.tree.blur(self.node) {
            tracing::warn!(node = ?self.node, %error, "blur request on a missing node");
        }
    }
}

impl Drop for FocusAccessor {
    fn drop(&mut self) {
        self.tree.remove_listener(self.node, self.listener);
    }
}

/// Read/write access to an input node's value, plus an input listener.
pub struct ValueAccessor {
    tree: NodeTree,
    node: NodeId,
    listener: ListenerId,
}

impl ValueAccessor {
    pub fn new(tree: &NodeTree, node: NodeId, on_input: impl Fn(&str) + 'static) -> Result<Self> {
        let listener = tree.add_input_listener(node, Rc::new(on_input))?;
        Ok(Self {
            tree: tree.clone(),
            node,
            listener,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn value(&self) -> Option<String> {
        self.tree.value(self.node)
    }

    pub fn set_value(&self, value: &str) -> Result<()> {
        self.tree.set_value(self.node, value)
    }
}

impl Drop for ValueAccessor {
    fn drop(&mut self) {
        self.tree.remove_listener(self.node, self.listener);
    }
}
