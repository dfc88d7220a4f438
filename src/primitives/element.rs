//! Element Primitive - A tagged tree node that contains other views.
//!
//! An element is a container: its content reports child nodes during the
//! element's layout pass, and the element reconciles its child list in the
//! tree to match. The tree node itself is created lazily at the first commit
//! that needs it, which is also when modifiers are mounted.
//!
//! # Modifiers
//!
//! Modifiers attach behavior to the element's tree node (focus binding, value
//! binding). They are mounted with the node, updated positionally on patch, and
//! unmounted at the commit that destroys the node.
//!
//! # Example
//!
//! ```ignore
//! use spark_ui::primitives::{element, text};
//!
//! let view = element("form", (
//!     element("label", text("Name")),
//!     element("input", ()).bind_value(name.binding()),
//! ));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use taffy::{NodeId, Style};

use super::mountable::{Mountable, MountedNode, NodeFlags, ReconcileOp, ViewContext};
use crate::diagnostics::{invariant_violation, usage_error};
use crate::engine::commit::Container;
use crate::engine::{CommitContext, ContainerHandle, LayoutPass, Transaction, apply_children};
use crate::error::Result;

// =============================================================================
// MODIFIERS
// =============================================================================

pub trait ElementModifier: 'static {
    /// Attach to the element's freshly created tree node.
    fn mount(&mut self, node: NodeId, ctx: &mut CommitContext);

    /// Take over configuration from the modifier at the same position in the
    /// next render. `next` is that modifier, boxed.
    fn update(&mut self, next: Box<dyn Any>, tx: &mut Transaction);

    fn unmount(&mut self, ctx: &mut CommitContext);

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

// =============================================================================
// ELEMENT
// =============================================================================

pub struct Element<C> {
    tag: String,
    style: Option<Style>,
    content: C,
    modifiers: Vec<Box<dyn ElementModifier>>,
}

/// Describe an element with the given tag and content.
pub fn element<C: Mountable>(tag: &str, content: C) -> Element<C> {
    Element {
        tag: tag.to_string(),
        style: None,
        content,
        modifiers: Vec::new(),
    }
}

impl<C: Mountable> Element<C> {
    pub fn modifier(mut self, modifier: impl ElementModifier) -> Self {
        self.modifiers.push(Box::new(modifier));
        self
    }

    /// Layout style of the element's tree node.
    pub fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }
}

pub(crate) struct ElementState<N> {
    tag: String,
    node: Option<NodeId>,
    style: Option<Style>,
    style_dirty: bool,
    content: Option<N>,
    modifiers: Vec<Box<dyn ElementModifier>>,
    flags: NodeFlags,
}

impl<N: MountedNode> ElementState<N> {
    fn new(tag: String, style: Option<Style>, modifiers: Vec<Box<dyn ElementModifier>>) -> Self {
        Self {
            tag,
            node: None,
            style_dirty: style.is_some(),
            style,
            content: None,
            modifiers,
            flags: NodeFlags::CHILDREN_DIRTY,
        }
    }

    /// State for a root container whose tree node is owned by the caller.
    pub(crate) fn root(node: NodeId) -> Self {
        Self {
            tag: String::new(),
            node: Some(node),
            style: None,
            style_dirty: false,
            content: None,
            modifiers: Vec::new(),
            flags: NodeFlags::MOUNTED | NodeFlags::CHILDREN_DIRTY,
        }
    }

    pub(crate) fn content_mut(&mut self) -> Option<&mut N> {
        self.content.as_mut()
    }

    pub(crate) fn set_content(&mut self, content: N) {
        self.content = Some(content);
        self.flags.insert(NodeFlags::CHILDREN_DIRTY);
    }

    pub(crate) fn take_content(&mut self) -> Option<N> {
        self.flags.insert(NodeFlags::CHILDREN_DIRTY);
        self.content.take()
    }

    fn ensure_node(&mut self, ctx: &mut CommitContext) -> Option<NodeId> {
        if self.flags.contains(NodeFlags::UNMOUNTED) {
            return None;
        }

        let node = match self.node {
            Some(node) => node,
            None => {
                let node = match ctx.tree().create_element(&self.tag) {
                    Ok(node) => node,
                    Err(error) => {
                        tracing::error!(tag = %self.tag, %error, "failed to create element node");
                        return None;
                    }
                };
                self.node = Some(node);
                for modifier in &mut self.modifiers {
                    modifier.mount(node, ctx);
                }
                self.flags.insert(NodeFlags::MOUNTED);
                node
            }
        };

        if self.style_dirty {
            self.style_dirty = false;
            let style = self.style.clone().unwrap_or_default();
            if let Err(error) = ctx.tree().set_style(node, style) {
                tracing::error!(tag = %self.tag, %error, "failed to apply element style");
            }
        }
        Some(node)
    }

    fn update_modifiers(&mut self, next: Vec<Box<dyn ElementModifier>>, tx: &mut Transaction) {
        if next.len() != self.modifiers.len() {
            usage_error(format_args!(
                "<{}> rendered with {} modifiers after mounting with {}, keeping the mounted set",
                self.tag,
                next.len(),
                self.modifiers.len()
            ));
        }
        for (current, incoming) in self.modifiers.iter_mut().zip(next) {
            current.update(incoming.into_any(), tx);
        }
    }
}

impl<N: MountedNode> Container for ElementState<N> {
    fn reconcile_children(&mut self, ctx: &mut CommitContext) -> Result<()> {
        let Some(parent) = self.ensure_node(ctx) else {
            return Ok(());
        };

        let mut pass = LayoutPass::new();
        if let Some(content) = self.content.as_mut() {
            content.collect_children(&mut pass, ctx);
        }
        self.flags.remove(NodeFlags::CHILDREN_DIRTY);

        let patch = apply_children(ctx.tree(), parent, pass.children())?;
        if patch != Default::default() {
            tracing::trace!(tag = %self.tag, ?patch, "children reconciled");
        }
        Ok(())
    }
}

pub struct ElementNode<N> {
    state: Rc<RefCell<ElementState<N>>>,
    container: ContainerHandle,
}

impl<N: MountedNode> ElementNode<N> {
    /// The tree node, once a commit has created it.
    pub fn node(&self) -> Option<NodeId> {
        self.state.borrow().node
    }

    pub fn flags(&self) -> NodeFlags {
        self.state.borrow().flags
    }
}

impl<C: Mountable> Mountable for Element<C> {
    type Node = ElementNode<C::Node>;

    fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> Self::Node {
        let state = Rc::new(RefCell::new(ElementState::new(
            self.tag,
            self.style,
            self.modifiers,
        )));
        let container = ContainerHandle::new(&state);

        let content = self
            .content
            .make_node(&ctx.with_container(container.clone()), tx);
        state.borrow_mut().set_content(content);
        tx.schedule_layout(&container);

        ElementNode { state, container }
    }

    fn patch_node(self, node: &mut Self::Node, tx: &mut Transaction) {
        let mut state = node.state.borrow_mut();
        if state.tag != self.tag {
            usage_error(format_args!(
                "element patched from <{}> to <{}>, keeping the mounted tag",
                state.tag, self.tag
            ));
        }
        if state.style != self.style {
            state.style = self.style;
            state.style_dirty = true;
            tx.schedule_layout(&node.container);
        }
        if let Some(content) = state.content_mut() {
            self.content.patch_node(content, tx);
        }
        state.update_modifiers(self.modifiers, tx);
    }
}

impl<N: MountedNode> MountedNode for ElementNode<N> {
    fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
        let mut state = self.state.borrow_mut();
        if let Some(node) = state.ensure_node(ctx) {
            if state.flags.contains(NodeFlags::MOVED) {
                tracing::trace!(tag = %state.tag, ?node, "element moved");
                state.flags.remove(NodeFlags::MOVED);
            }
            pass.push(node);
        }
    }

    fn apply(&mut self, op: ReconcileOp, _tx: &mut Transaction) {
        match op {
            ReconcileOp::Moved => self.state.borrow_mut().flags.insert(NodeFlags::MOVED),
        }
    }

    fn unmount(&mut self, tx: &mut Transaction) {
        let mut state = self.state.borrow_mut();
        if state.flags.contains(NodeFlags::UNMOUNTED) {
            invariant_violation(
                Some(tx.runtime()),
                format_args!("<{}> unmounted twice", state.tag),
            );
            return;
        }
        state.flags.insert(NodeFlags::UNMOUNTED);

        if let Some(mut content) = state.content.take() {
            content.unmount(tx);
        }

        let mounted = state.flags.contains(NodeFlags::MOUNTED);
        let mut modifiers = std::mem::take(&mut state.modifiers);
        let node = state.node.take();
        tx.defer_commit(move |ctx| {
            if mounted {
                for modifier in &mut modifiers {
                    modifier.unmount(ctx);
                }
            }
            drop(modifiers);
            if let Some(node) = node {
                if let Err(error) = ctx.tree().destroy(node) {
                    tracing::error!(?node, %error, "failed to destroy element node");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use taffy::prelude::TaffyMaxContent;
    use super::*;
    use crate::engine::Runtime;
    use crate::pipeline::mount;
    use crate::primitives::text;
    use std::cell::Cell;

    struct CountingModifier {
        mounted: Rc<Cell<i32>>,
    }

    impl ElementModifier for CountingModifier {
        fn mount(&mut self, _node: NodeId, _ctx: &mut CommitContext) {
            self.mounted.set(self.mounted.get() + 1);
        }

        fn update(&mut self, _next: Box<dyn Any>, _tx: &mut Transaction) {}

        fn unmount(&mut self, _ctx: &mut CommitContext) {
            self.mounted.set(self.mounted.get() - 1);
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    #[test]
    fn test_nested_elements_render() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("body").unwrap();

        let view = element("ul", (element("li", text("one")), element("li", text("two"))));
        let _handle = mount(&rt, root, view).unwrap();

        assert_eq!(
            rt.node_tree().render(root),
            "<body><ul><li>one</li><li>two</li></ul></body>"
        );
    }

    #[test]
    fn test_modifiers_mount_with_node_and_unmount_with_it() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("body").unwrap();
        let mounted = Rc::new(Cell::new(0));

        let view = element("input", ()).modifier(CountingModifier {
            mounted: mounted.clone(),
        });
        let handle = mount(&rt, root, view).unwrap();
        assert_eq!(mounted.get(), 1);

        handle.unmount().unwrap();
        assert_eq!(mounted.get(), 0);
        assert_eq!(rt.node_tree().render(root), "<body></body>");
    }

    #[test]
    fn test_style_is_applied_to_tree_node() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("body").unwrap();
        let style = Style {
            size: taffy::Size {
                width: taffy::Dimension::Length(12.0),
                height: taffy::Dimension::Length(3.0),
            },
            ..Style::default()
        };

        let handle = mount(&rt, root, element("div", ()).style(style)).unwrap();
        let tree = rt.node_tree();
        tree.compute_layout(root, taffy::Size::MAX_CONTENT).unwrap();

        let div = tree.children(root).unwrap()[0];
        assert_eq!(tree.layout(div).unwrap().size.width, 12.0);
        drop(handle);
    }
}
