//! Mount API - Attaching a view to a node of the tree.
//!
//! [`mount`] makes the view's nodes under a caller-owned root node inside one
//! transaction. The returned [`MountHandle`] re-renders the root with a new
//! view of the same type (patching in place) and unmounts it again.
//!
//! # Example
//!
//! ```ignore
//! use spark_ui::pipeline::mount;
//!
//! let runtime = Runtime::new();
//! let root = runtime.node_tree().create_element("body")?;
//!
//! let handle = mount(&runtime, root, element("h1", text("Hello")))?;
//! handle.update(element("h1", text("Hello again")))?;
//!
//! // Clean up
//! handle.unmount()?;
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use taffy::NodeId;

use crate::engine::{ContainerHandle, Runtime};
use crate::error::{Error, Result};
use crate::primitives::{ElementState, Mountable, MountedNode, ViewContext};

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`].
///
/// Dropping it unmounts the view; call [`MountHandle::unmount`] to observe
/// the outcome instead.
pub struct MountHandle<V: Mountable> {
    runtime: Runtime,
    root: NodeId,
    state: Rc<RefCell<ElementState<V::Node>>>,
    container: ContainerHandle,
    unmounted: bool,
}

impl<V: Mountable> MountHandle<V> {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Render `view` in place of the current one.
    ///
    /// The mounted node is patched, so retained tree nodes keep their ids.
    pub fn update(&self, view: V) -> Result<()> {
        if self.unmounted {
            return Ok(());
        }
        self.runtime.transaction(|tx| {
            let mut state = self.state.borrow_mut();
            match state.content_mut() {
                Some(node) => view.patch_node(node, tx),
                None => {
                    let node = view.make_node(&ViewContext::new(self.container.clone()), tx);
                    state.set_content(node);
                    tx.schedule_layout(&self.container);
                }
            }
        })
    }

    /// Unmount the view and detach its nodes from the root.
    ///
    /// The root node itself stays in the tree.
    pub fn unmount(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.unmounted, true) {
            return Ok(());
        }
        tracing::debug!(root = ?self.root, "unmounting view");
        self.runtime.transaction(|tx| {
            let content = self.state.borrow_mut().take_content();
            if let Some(mut content) = content {
                content.unmount(tx);
            }
            tx.schedule_layout(&self.container);
        })
    }
}

impl<V: Mountable> Drop for MountHandle<V> {
    fn drop(&mut self) {
        if let Err(error) = self.teardown() {
            tracing::error!(root = ?self.root, %error, "unmount on drop failed");
        }
    }
}

// =============================================================================
// Mount
// =============================================================================

/// Mount `view` as the content of `root`.
///
/// # Errors
///
/// [`Error::UnknownNode`] if `root` is not in the runtime's tree, or the
/// failure of the mounting transaction.
pub fn mount<V: Mountable>(runtime: &Runtime, root: NodeId, view: V) -> Result<MountHandle<V>> {
    if !runtime.node_tree().contains(root) {
        return Err(Error::UnknownNode(root));
    }

    let state = Rc::new(RefCell::new(ElementState::<V::Node>::root(root)));
    let container = ContainerHandle::new(&state);

    let mut handle = MountHandle {
        runtime: runtime.clone(),
        root,
        state,
        container,
        unmounted: false,
    };

    let outcome = runtime.transaction(|tx| {
        let node = view.make_node(&ViewContext::new(handle.container.clone()), tx);
        handle.state.borrow_mut().set_content(node);
        tx.schedule_layout(&handle.container);
    });
    if let Err(error) = outcome {
        handle.unmounted = true;
        return Err(error);
    }

    tracing::debug!(?root, "view mounted");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{element, text};
    use crate::renderer::Mutation;

    #[test]
    fn test_mount_rejects_unknown_root() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("body").unwrap();
        rt.node_tree().destroy(root).unwrap();

        let result = mount(&rt, root, text("x"));

        assert!(matches!(result, Err(Error::UnknownNode(node)) if node == root));
    }

    #[test]
    fn test_update_keeps_tree_nodes() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("body").unwrap();
        let handle = mount(&rt, root, element("h1", text("one"))).unwrap();
        let h1 = rt.node_tree().children(root).unwrap()[0];

        handle.update(element("h1", text("two"))).unwrap();

        assert_eq!(rt.node_tree().children(root).unwrap(), vec![h1]);
        assert_eq!(rt.node_tree().render(root), "<body><h1>two</h1></body>");
    }

    #[test]
    fn test_unmount_keeps_root_and_destroys_content() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("body").unwrap();
        let handle = mount(&rt, root, element("h1", text("one"))).unwrap();
        rt.node_tree().take_mutations();

        handle.unmount().unwrap();

        let tree = rt.node_tree();
        assert!(tree.contains(root));
        assert_eq!(tree.node_count(), 1);
        let destroyed = tree
            .take_mutations()
            .into_iter()
            .filter(|m| matches!(m, Mutation::Destroy { .. }))
            .count();
        assert_eq!(destroyed, 2);
    }

    #[test]
    fn test_drop_unmounts() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("body").unwrap();

        drop(mount(&rt, root, element("h1", ())).unwrap());

        assert_eq!(rt.node_tree().render(root), "<body></body>");
        assert_eq!(rt.node_tree().node_count(), 1);
    }
}
