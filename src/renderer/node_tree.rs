//! Node Tree - The element/text tree the reconciler writes into.
//!
//! Nodes live in a `taffy::TaffyTree`, so every element doubles as a layout
//! box. Each node carries a [`NodeData`] context holding its kind, text content,
//! input value and the event listeners installed by accessors.
//!
//! Structural and content writes are appended to a mutation log, which is what
//! a host renderer (or a test) drains with [`NodeTree::take_mutations`].
//!
//! # Events
//!
//! `focus`, `blur` and `dispatch_input` play the role of the host: they update
//! tree state first, release every internal borrow, then invoke listeners.
//! Listeners are free to call back into the tree.
//!
//! # Example
//!
//! ```ignore
//! use spark_ui::renderer::NodeTree;
//!
//! let tree = NodeTree::new();
//! let root = tree.create_element("div")?;
//! let label = tree.create_text("hello")?;
//! tree.insert_before(root, label, None)?;
//! assert_eq!(tree.render(root), "<div>hello</div>");
//! ```

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use taffy::{AvailableSpace, Layout, NodeId, Size, Style, TaffyTree};

use crate::error::{Error, Result};

// =============================================================================
// NODE DATA
// =============================================================================

/// Focus transitions delivered to focus listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    Focus,
    Blur,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element { tag: String },
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ListenerId(u64);

type FocusListener = Rc<dyn Fn(FocusEvent)>;
type InputListener = Rc<dyn Fn(&str)>;

pub struct NodeData {
    kind: NodeKind,
    text: String,
    value: String,
    focus_listeners: Vec<(ListenerId, FocusListener)>,
    input_listeners: Vec<(ListenerId, InputListener)>,
}

impl NodeData {
    fn new(kind: NodeKind, text: String) -> Self {
        Self {
            kind,
            text,
            value: String::new(),
            focus_listeners: Vec::new(),
            input_listeners: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// A recorded change to the tree, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { node: NodeId },
    Insert { parent: NodeId, child: NodeId, index: usize },
    Move { parent: NodeId, child: NodeId, index: usize },
    Remove { parent: NodeId, child: NodeId },
    Destroy { node: NodeId },
    SetText { node: NodeId, text: String },
    SetValue { node: NodeId, value: String },
}

// =============================================================================
// NODE TREE
// =============================================================================

struct TreeState {
    taffy: TaffyTree<NodeData>,
    focused: Option<NodeId>,
    mutations: Vec<Mutation>,
    next_listener: u64,
}

impl TreeState {
    fn data(&self, node: NodeId) -> Result<&NodeData> {
        self.taffy
            .get_node_context(node)
            .ok_or(Error::UnknownNode(node))
    }

    fn data_mut(&mut self, node: NodeId) -> Result<&mut NodeData> {
        self.taffy
            .get_node_context_mut(node)
            .ok_or(Error::UnknownNode(node))
    }

    fn next_listener(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }
}

/// Shared handle to a node tree. Clones refer to the same tree.
#[derive(Clone)]
pub struct NodeTree {
    inner: Rc<RefCell<TreeState>>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("NodeTree")
            .field("nodes", &state.taffy.total_node_count())
            .field("focused", &state.focused)
            .finish()
    }
}

impl NodeTree {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(TreeState {
                taffy: TaffyTree::new(),
                focused: None,
                mutations: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    pub fn ptr_eq(&self, other: &NodeTree) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    pub fn create_element(&self, tag: &str) -> Result<NodeId> {
        let kind = NodeKind::Element { tag: tag.to_string() };
        self.create(NodeData::new(kind, String::new()))
    }

    pub fn create_text(&self, text: &str) -> Result<NodeId> {
        self.create(NodeData::new(NodeKind::Text, text.to_string()))
    }

    fn create(&self, data: NodeData) -> Result<NodeId> {
        let mut state = self.inner.borrow_mut();
        let node = state.taffy.new_leaf_with_context(Style::default(), data)?;
        state.mutations.push(Mutation::Create { node });
        Ok(node)
    }

    /// Destroy a node. It is detached from its parent first if attached.
    ///
    /// Children that are still attached are detached and left alive; the
    /// reconciler destroys them through their own unmount.
    pub fn destroy(&self, node: NodeId) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        state.data(node)?;

        if let Some(parent) = state.taffy.parent(node) {
            state.taffy.remove_child(parent, node)?;
            state.mutations.push(Mutation::Remove { parent, child: node });
        }
        for child in state.taffy.children(node)? {
            state.taffy.remove_child(node, child)?;
        }
        if state.focused == Some(node) {
            state.focused = None;
        }

        state.taffy.remove(node)?;
        state.mutations.push(Mutation::Destroy { node });
        Ok(())
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.borrow().taffy.get_node_context(node).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.inner.borrow().taffy.total_node_count()
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    pub fn children(&self, parent: NodeId) -> Result<Vec<NodeId>> {
        let state = self.inner.borrow();
        state.data(parent)?;
        Ok(state.taffy.children(parent)?)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let state = self.inner.borrow();
        state.data(node).ok()?;
        state.taffy.parent(node)
    }

    /// Insert `child` into `parent` before `before`, or at the end when
    /// `before` is `None`. A child already attached somewhere is moved.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        state.data(parent)?;
        state.data(child)?;

        let previous_parent = state.taffy.parent(child);
        if let Some(previous) = previous_parent {
            state.taffy.remove_child(previous, child)?;
        }

        let siblings = state.taffy.children(parent)?;
        let index = match before {
            Some(anchor) => siblings
                .iter()
                .position(|&n| n == anchor)
                .ok_or(Error::NotAChild { parent, child: anchor })?,
            None => siblings.len(),
        };
        state.taffy.insert_child_at_index(parent, index, child)?;

        let mutation = if previous_parent == Some(parent) {
            Mutation::Move { parent, child, index }
        } else {
            Mutation::Insert { parent, child, index }
        };
        state.mutations.push(mutation);
        Ok(())
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        state.data(parent)?;
        state.data(child)?;
        if state.taffy.parent(child) != Some(parent) {
            return Err(Error::NotAChild { parent, child });
        }
        state.taffy.remove_child(parent, child)?;
        state.mutations.push(Mutation::Remove { parent, child });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    pub fn tag(&self, node: NodeId) -> Option<String> {
        let state = self.inner.borrow();
        match &state.data(node).ok()?.kind {
            NodeKind::Element { tag } => Some(tag.clone()),
            NodeKind::Text => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        let state = self.inner.borrow();
        state.data(node).ok().map(|data| data.text.clone())
    }

    pub fn set_text(&self, node: NodeId, text: &str) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        let data = state.data_mut(node)?;
        if data.text == text {
            return Ok(());
        }
        data.text = text.to_string();
        state.mutations.push(Mutation::SetText {
            node,
            text: text.to_string(),
        });
        Ok(())
    }

    pub fn value(&self, node: NodeId) -> Option<String> {
        let state = self.inner.borrow();
        state.data(node).ok().map(|data| data.value.clone())
    }

    pub fn set_value(&self, node: NodeId, value: &str) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        let data = state.data_mut(node)?;
        if data.value == value {
            return Ok(());
        }
        data.value = value.to_string();
        state.mutations.push(Mutation::SetValue {
            node,
            value: value.to_string(),
        });
        Ok(())
    }

    /// Serialize the subtree under `node` as markup. Used for inspection and tests.
    pub fn render(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.render_into(node, &mut out);
        out
    }

    fn render_into(&self, node: NodeId, out: &mut String) {
        let (kind, text, value, children) = {
            let state = self.inner.borrow();
            let Ok(data) = state.data(node) else {
                return;
            };
            let children = state.taffy.children(node).unwrap_or_default();
            (data.kind.clone(), data.text.clone(), data.value.clone(), children)
        };

        match kind {
            NodeKind::Text => out.push_str(&text),
            NodeKind::Element { tag } => {
                let _ = write!(out, "<{tag}");
                if !value.is_empty() {
                    let _ = write!(out, " value=\"{value}\"");
                }
                out.push('>');
                for child in children {
                    self.render_into(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Mutation log
    // -------------------------------------------------------------------------

    pub fn take_mutations(&self) -> Vec<Mutation> {
        std::mem::take(&mut self.inner.borrow_mut().mutations)
    }

    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------

    pub fn set_style(&self, node: NodeId, style: Style) -> Result<()> {
        Ok(self.inner.borrow_mut().taffy.set_style(node, style)?)
    }

    pub fn compute_layout(&self, root: NodeId, available: Size<AvailableSpace>) -> Result<()> {
        Ok(self.inner.borrow_mut().taffy.compute_layout(root, available)?)
    }

    pub fn layout(&self, node: NodeId) -> Result<Layout> {
        Ok(*self.inner.borrow().taffy.layout(node)?)
    }

    // -------------------------------------------------------------------------
    // Focus
    // -------------------------------------------------------------------------

    pub fn focused(&self) -> Option<NodeId> {
        self.inner.borrow().focused
    }

    /// Move focus to `node`. Blurs the previously focused node first.
    /// Focusing the already focused node does nothing.
    pub fn focus(&self, node: NodeId) -> Result<()> {
        let (blurred, focused) = {
            let mut state = self.inner.borrow_mut();
            if state.focused == Some(node) {
                return Ok(());
            }
            let focused = listeners_of(&state.data(node)?.focus_listeners);
            let blurred = match state.focused {
                Some(previous) => state
                    .data(previous)
                    .map(|data| listeners_of(&data.focus_listeners))
                    .unwrap_or_default(),
                None => Vec::new(),
            };
            state.focused = Some(node);
            (blurred, focused)
        };

        for listener in blurred {
            listener(FocusEvent::Blur);
        }
        for listener in focused {
            listener(FocusEvent::Focus);
        }
        Ok(())
    }

    /// Remove focus from `node` if it currently holds it.
    pub fn blur(&self, node: NodeId) -> Result<()> {
        let blurred = {
            let mut state = self.inner.borrow_mut();
            let listeners = listeners_of(&state.data(node)?.focus_listeners);
            if state.focused != Some(node) {
                return Ok(());
            }
            state.focused = None;
            listeners
        };

        for listener in blurred {
            listener(FocusEvent::Blur);
        }
        Ok(())
    }

    /// Simulate the user editing an input: store the value, then notify.
    pub fn dispatch_input(&self, node: NodeId, value: &str) -> Result<()> {
        self.set_value(node, value)?;
        let listeners = {
            let state = self.inner.borrow();
            listeners_of(&state.data(node)?.input_listeners)
        };
        for listener in listeners {
            listener(value);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Listeners (installed through accessors)
    // -------------------------------------------------------------------------

    pub(crate) fn add_focus_listener(
        &self,
        node: NodeId,
        listener: FocusListener,
    ) -> Result<ListenerId> {
        let mut state = self.inner.borrow_mut();
        let id = state.next_listener();
        state.data_mut(node)?.focus_listeners.push((id, listener));
        Ok(id)
    }

    pub(crate) fn add_input_listener(
        &self,
        node: NodeId,
        listener: InputListener,
    ) -> Result<ListenerId> {
        let mut state = self.inner.borrow_mut();
        let id = state.next_listener();
        state.data_mut(node)?.input_listeners.push((id, listener));
        Ok(id)
    }

    /// Remove a listener. The closure is dropped after the tree borrow is released.
    pub(crate) fn remove_listener(&self, node: NodeId, id: ListenerId) -> bool {
        let mut removed_focus = None;
        let mut removed_input = None;
        {
            let mut state = self.inner.borrow_mut();
            let Ok(data) = state.data_mut(node) else {
                return false;
            };
            if let Some(pos) = data.focus_listeners.iter().position(|(l, _)| *l == id) {
                removed_focus = Some(data.focus_listeners.remove(pos));
            } else if let Some(pos) = data.input_listeners.iter().position(|(l, _)| *l == id) {
                removed_input = Some(data.input_listeners.remove(pos));
            }
        }
        removed_focus.is_some() || removed_input.is_some()
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        let state = self.inner.borrow();
        state
            .data(node)
            .map(|data| data.focus_listeners.len() + data.input_listeners.len())
            .unwrap_or(0)
    }
}

fn listeners_of<L: Clone>(listeners: &[(ListenerId, L)]) -> Vec<L> {
    listeners.iter().map(|(_, listener)| listener.clone()).collect()
}
