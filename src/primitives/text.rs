//! Text Primitives - Static and reactive text leaves.
//!
//! - [`text`] renders a fixed string; patching with a different string
//!   updates the tree node in place at the next commit.
//! - [`dyn_text`] renders the result of a closure and is a function node:
//!   when state read by the closure changes, only this text reruns.
//!
//! `&'static str` and `String` are views too, rendering as static text.
//!
//! # Example
//!
//! ```ignore
//! use spark_ui::primitives::{dyn_text, element, text};
//!
//! let count = StateCell::new(&runtime, 0);
//! let label = {
//!     let count = count.clone();
//!     dyn_text(move || format!("clicked {} times", count.get()))
//! };
//! let view = element("p", (text("Status: "), label));
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use taffy::NodeId;

use super::mountable::{Mountable, MountedNode, ReconcileOp, ViewContext};
use crate::engine::{
    AnyFunctionNode, CommitContext, ContainerHandle, LayoutPass, Transaction, invalidation_hook,
};
use crate::reactive::TrackingSession;

// =============================================================================
// TEXT LEAF
// =============================================================================

/// Tree-side state shared by both text kinds.
struct TextLeaf {
    content: String,
    node: Option<NodeId>,
    dirty: bool,
}

impl TextLeaf {
    fn new(content: String) -> Self {
        Self {
            content,
            node: None,
            dirty: true,
        }
    }

    /// Returns true when the content actually changed.
    fn set(&mut self, content: String) -> bool {
        if self.content == content {
            return false;
        }
        self.content = content;
        self.dirty = true;
        true
    }

    fn collect(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
        let node = match self.node {
            Some(node) => {
                if self.dirty {
                    if let Err(error) = ctx.tree().set_text(node, &self.content) {
                        tracing::error!(?node, %error, "failed to update text node");
                    }
                }
                node
            }
            None => match ctx.tree().create_text(&self.content) {
                Ok(node) => {
                    self.node = Some(node);
                    node
                }
                Err(error) => {
                    tracing::error!(%error, "failed to create text node");
                    return;
                }
            },
        };
        self.dirty = false;
        pass.push(node);
    }

    fn unmount(&mut self, tx: &mut Transaction) {
        if let Some(node) = self.node.take() {
            tx.defer_commit(move |ctx| {
                if let Err(error) = ctx.tree().destroy(node) {
                    tracing::error!(?node, %error, "failed to destroy text node");
                }
            });
        }
    }
}

// =============================================================================
// STATIC TEXT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    content: String,
}

pub fn text(content: impl Into<String>) -> Text {
    Text {
        content: content.into(),
    }
}

pub struct TextNode {
    leaf: TextLeaf,
    container: ContainerHandle,
}

impl TextNode {
    pub fn content(&self) -> &str {
        &self.leaf.content
    }
}

impl Mountable for Text {
    type Node = TextNode;

    fn make_node(self, ctx: &ViewContext, _tx: &mut Transaction) -> TextNode {
        TextNode {
            leaf: TextLeaf::new(self.content),
            container: ctx.container().clone(),
        }
    }

    fn patch_node(self, node: &mut TextNode, tx: &mut Transaction) {
        if node.leaf.set(self.content) {
            tx.schedule_layout(&node.container);
        }
    }
}

impl MountedNode for TextNode {
    fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
        self.leaf.collect(pass, ctx);
    }

    fn apply(&mut self, _op: ReconcileOp, _tx: &mut Transaction) {}

    fn unmount(&mut self, tx: &mut Transaction) {
        self.leaf.unmount(tx);
    }
}

impl Mountable for &'static str {
    type Node = TextNode;

    fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> TextNode {
        text(self).make_node(ctx, tx)
    }

    fn patch_node(self, node: &mut TextNode, tx: &mut Transaction) {
        text(self).patch_node(node, tx)
    }
}

impl Mountable for String {
    type Node = TextNode;

    fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> TextNode {
        text(self).make_node(ctx, tx)
    }

    fn patch_node(self, node: &mut TextNode, tx: &mut Transaction) {
        text(self).patch_node(node, tx)
    }
}

// =============================================================================
// DYNAMIC TEXT
// =============================================================================

pub struct DynText {
    render: Rc<dyn Fn() -> String>,
}

/// Text computed by `render`, recomputed when its reads change.
pub fn dyn_text(render: impl Fn() -> String + 'static) -> DynText {
    DynText {
        render: Rc::new(render),
    }
}

struct DynTextState {
    render: Rc<dyn Fn() -> String>,
    leaf: TextLeaf,
    container: ContainerHandle,
    function: AnyFunctionNode,
    session: Option<TrackingSession>,
    unmounted: bool,
}

impl DynTextState {
    fn run(state: &Rc<RefCell<Self>>, tx: &mut Transaction) {
        let mut this = state.borrow_mut();
        if this.unmounted {
            return;
        }
        drop(this.session.take());

        let runtime = tx.runtime().clone();
        let render = this.render.clone();
        let (content, session) =
            runtime.track(|| render(), invalidation_hook(&runtime, &this.function));
        this.session = Some(session);

        let first_run = this.leaf.node.is_none();
        if this.leaf.set(content) || first_run {
            tx.schedule_layout(&this.container);
        }
    }
}

pub struct DynTextNode {
    state: Rc<RefCell<DynTextState>>,
}

impl DynTextNode {
    pub fn content(&self) -> String {
        self.state.borrow().leaf.content.clone()
    }
}

impl Mountable for DynText {
    type Node = DynTextNode;

    fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> DynTextNode {
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<DynTextState>>| {
            let weak = weak.clone();
            let function = AnyFunctionNode::new(tx.runtime(), ctx.function_depth(), move |tx| {
                if let Some(state) = weak.upgrade() {
                    DynTextState::run(&state, tx);
                }
            });
            RefCell::new(DynTextState {
                render: self.render,
                leaf: TextLeaf::new(String::new()),
                container: ctx.container().clone(),
                function,
                session: None,
                unmounted: false,
            })
        });
        tx.add_function(&state.borrow().function);
        DynTextNode { state }
    }

    fn patch_node(self, node: &mut DynTextNode, tx: &mut Transaction) {
        let function = {
            let mut state = node.state.borrow_mut();
            state.render = self.render;
            state.function.clone()
        };
        tx.add_function(&function);
    }
}

impl MountedNode for DynTextNode {
    fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
        self.state.borrow_mut().leaf.collect(pass, ctx);
    }

    fn apply(&mut self, _op: ReconcileOp, _tx: &mut Transaction) {}

    fn unmount(&mut self, tx: &mut Transaction) {
        let mut state = self.state.borrow_mut();
        state.unmounted = true;
        drop(state.session.take());
        tx.cancel_function(state.function.id());
        state.leaf.unmount(tx);
    }
}
