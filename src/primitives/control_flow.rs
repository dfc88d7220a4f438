//! Control Flow Primitives - Conditional and list rendering.
//!
//! This module provides control flow primitives for dynamic UI:
//! - [`show`] - Conditional rendering based on reactive conditions
//! - [`each`] - Keyed list rendering with minimal moves
//!
//! Both are function nodes. Their closures run inside a tracking session;
//! when anything they read changes, the node is scheduled for rerun in the
//! current transaction and recomputes its content there.
//!
//! # Component Lifecycle
//!
//! ## show()
//! - When the condition flips: the previous branch is unmounted, the new one made
//! - When it doesn't: the current branch is patched with the freshly built view
//! - Without an else branch, a false condition renders nothing
//! - On unmount: session cancelled, pending rerun withdrawn, branch unmounted
//!
//! ## each()
//! - Items tracked by key (from `key_fn`)
//! - New keys: view made and mounted
//! - Existing keys: view patched in place (NO node recreation!)
//! - Reordered keys: only entries outside the longest stable run move
//! - Removed keys: unmounted exactly once
//! - Duplicate keys: first occurrence wins, the rest are logged and skipped
//!
//! Content of both renders into the enclosing container, one function depth
//! deeper, so nested function nodes always rerun after their parent.

use std::cell::RefCell;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use super::mountable::{Mountable, MountedNode, ReconcileOp, ViewContext};
use crate::engine::{AnyFunctionNode, CommitContext, LayoutPass, Transaction, invalidation_hook};
use crate::reactive::TrackingSession;
use crate::reconcile::KeyedNode;

// =============================================================================
// SHOW
// =============================================================================

pub struct Show<A, B> {
    condition: Rc<dyn Fn() -> bool>,
    then_fn: Rc<dyn Fn() -> A>,
    else_fn: Option<Rc<dyn Fn() -> B>>,
}

impl<A, B> Clone for Show<A, B> {
    fn clone(&self) -> Self {
        Self {
            condition: self.condition.clone(),
            then_fn: self.then_fn.clone(),
            else_fn: self.else_fn.clone(),
        }
    }
}

/// Conditionally render a view based on a reactive condition.
///
/// # Arguments
///
/// * `condition` - Getter that returns boolean (creates reactive dependency)
/// * `then_fn` - Builds the view shown while the condition is true
/// * `else_fn` - Optional builder for the false case
///
/// # Example
///
/// ```ignore
/// let visible = StateCell::new(&runtime, true);
/// let flag = visible.clone();
///
/// let view = show(
///     move || flag.get(),
///     || text("Visible!"),
///     Some(|| text("Hidden replacement")),
/// );
///
/// // Without else branch
/// let view = show(move || flag.get(), || text("Visible!"), None::<fn() -> Text>);
/// ```
pub fn show<A, B, ThenF, ElseF>(
    condition: impl Fn() -> bool + 'static,
    then_fn: ThenF,
    else_fn: Option<ElseF>,
) -> Show<A, B>
where
    A: Mountable,
    B: Mountable,
    ThenF: Fn() -> A + 'static,
    ElseF: Fn() -> B + 'static,
{
    Show {
        condition: Rc::new(condition),
        then_fn: Rc::new(then_fn),
        else_fn: else_fn.map(|f| Rc::new(f) as Rc<dyn Fn() -> B>),
    }
}

enum Branch<A, B> {
    Then(A),
    Else(B),
    Empty,
}

struct ShowState<A: Mountable, B: Mountable> {
    source: Show<A, B>,
    branch: Branch<A::Node, B::Node>,
    context: ViewContext,
    function: AnyFunctionNode,
    session: Option<TrackingSession>,
    unmounted: bool,
}

impl<A: Mountable, B: Mountable> ShowState<A, B> {
    fn run(state: &Rc<RefCell<Self>>, tx: &mut Transaction) {
        let mut this = state.borrow_mut();
        if this.unmounted {
            return;
        }
        drop(this.session.take());

        let runtime = tx.runtime().clone();
        let source = this.source.clone();
        let (view, session) = runtime.track(
            || {
                if (source.condition)() {
                    Branch::Then((source.then_fn)())
                } else {
                    match &source.else_fn {
                        Some(else_fn) => Branch::Else(else_fn()),
                        None => Branch::Empty,
                    }
                }
            },
            invalidation_hook(&runtime, &this.function),
        );
        this.session = Some(session);

        let this = &mut *this;
        let context = &this.context;
        match (&mut this.branch, view) {
            (Branch::Then(node), Branch::Then(view)) => view.patch_node(node, tx),
            (Branch::Else(node), Branch::Else(view)) => view.patch_node(node, tx),
            (Branch::Empty, Branch::Empty) => {}
            (current, view) => {
                let previous = std::mem::replace(current, Branch::Empty);
                unmount_branch(previous, tx);
                *current = match view {
                    Branch::Then(view) => Branch::Then(view.make_node(context, tx)),
                    Branch::Else(view) => Branch::Else(view.make_node(context, tx)),
                    Branch::Empty => Branch::Empty,
                };
                tx.schedule_layout(context.container());
            }
        }
    }
}

fn unmount_branch<A: MountedNode, B: MountedNode>(branch: Branch<A, B>, tx: &mut Transaction) {
    match branch {
        Branch::Then(mut node) => node.unmount(tx),
        Branch::Else(mut node) => node.unmount(tx),
        Branch::Empty => {}
    }
}

pub struct ShowNode<A: Mountable, B: Mountable> {
    state: Rc<RefCell<ShowState<A, B>>>,
}

impl<A: Mountable, B: Mountable> Mountable for Show<A, B> {
    type Node = ShowNode<A, B>;

    fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> Self::Node {
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<ShowState<A, B>>>| {
            let weak = weak.clone();
            let function = AnyFunctionNode::new(tx.runtime(), ctx.function_depth(), move |tx| {
                if let Some(state) = weak.upgrade() {
                    ShowState::run(&state, tx);
                }
            });
            RefCell::new(ShowState {
                source: self,
                branch: Branch::Empty,
                context: ctx.nested_in_function(),
                function,
                session: None,
                unmounted: false,
            })
        });
        tx.add_function(&state.borrow().function);
        ShowNode { state }
    }

    fn patch_node(self, node: &mut Self::Node, tx: &mut Transaction) {
        let function = {
            let mut state = node.state.borrow_mut();
            state.source = self;
            state.function.clone()
        };
        tx.add_function(&function);
    }
}

impl<A: Mountable, B: Mountable> MountedNode for ShowNode<A, B> {
    fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
        match &mut self.state.borrow_mut().branch {
            Branch::Then(node) => node.collect_children(pass, ctx),
            Branch::Else(node) => node.collect_children(pass, ctx),
            Branch::Empty => {}
        }
    }

    fn apply(&mut self, op: ReconcileOp, tx: &mut Transaction) {
        match &mut self.state.borrow_mut().branch {
            Branch::Then(node) => node.apply(op, tx),
            Branch::Else(node) => node.apply(op, tx),
            Branch::Empty => {}
        }
    }

    fn unmount(&mut self, tx: &mut Transaction) {
        let mut state = self.state.borrow_mut();
        state.unmounted = true;
        drop(state.session.take());
        tx.cancel_function(state.function.id());
        let branch = std::mem::replace(&mut state.branch, Branch::Empty);
        unmount_branch(branch, tx);
    }
}

// =============================================================================
// EACH
// =============================================================================

pub struct ForEach<T, K, V> {
    items: Rc<dyn Fn() -> Vec<T>>,
    key_fn: Rc<dyn Fn(&T) -> K>,
    render_fn: Rc<dyn Fn(&T) -> V>,
}

impl<T, K, V> Clone for ForEach<T, K, V> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            key_fn: self.key_fn.clone(),
            render_fn: self.render_fn.clone(),
        }
    }
}

/// Render a keyed list with fine-grained updates.
///
/// # Arguments
///
/// * `items` - Getter for the current items (creates reactive dependency)
/// * `key_fn` - Stable, unique key per item
/// * `render_fn` - Builds the view for one item
///
/// # Example
///
/// ```ignore
/// let todos = StateCell::new(&runtime, vec![Todo::new(1, "write"), Todo::new(2, "ship")]);
/// let list = todos.clone();
///
/// let view = element("ul", each(
///     move || list.get(),
///     |todo| todo.id,
///     |todo| element("li", text(todo.title.clone())),
/// ));
/// ```
pub fn each<T, K, V>(
    items: impl Fn() -> Vec<T> + 'static,
    key_fn: impl Fn(&T) -> K + 'static,
    render_fn: impl Fn(&T) -> V + 'static,
) -> ForEach<T, K, V>
where
    T: 'static,
    K: Hash + Eq + Clone + Debug + 'static,
    V: Mountable,
{
    ForEach {
        items: Rc::new(items),
        key_fn: Rc::new(key_fn),
        render_fn: Rc::new(render_fn),
    }
}

struct ForEachState<T, K, V: Mountable> {
    source: ForEach<T, K, V>,
    keyed: KeyedNode<K, V::Node>,
    context: ViewContext,
    function: AnyFunctionNode,
    session: Option<TrackingSession>,
    unmounted: bool,
}

impl<T, K, V> ForEachState<T, K, V>
where
    T: 'static,
    K: Hash + Eq + Clone + Debug + 'static,
    V: Mountable,
{
    fn run(state: &Rc<RefCell<Self>>, tx: &mut Transaction) {
        let mut this = state.borrow_mut();
        if this.unmounted {
            return;
        }
        drop(this.session.take());

        let runtime = tx.runtime().clone();
        let source = this.source.clone();
        let (rows, session) = runtime.track(
            || {
                (source.items)()
                    .iter()
                    .map(|item| ((source.key_fn)(item), (source.render_fn)(item)))
                    .collect::<Vec<_>>()
            },
            invalidation_hook(&runtime, &this.function),
        );
        this.session = Some(session);

        let (keys, views): (Vec<K>, Vec<V>) = rows.into_iter().unzip();
        let mut views: Vec<Option<V>> = views.into_iter().map(Some).collect();

        let this = &mut *this;
        let context = &this.context;
        this.keyed.patch(keys, tx, |index, slot, tx| {
            let Some(view) = views[index].take() else {
                return;
            };
            match slot {
                Some(node) => view.patch_node(node, tx),
                None => *slot = Some(view.make_node(context, tx)),
            }
        });
    }
}

pub struct ForEachNode<T, K, V: Mountable> {
    state: Rc<RefCell<ForEachState<T, K, V>>>,
}

impl<T, K, V> ForEachNode<T, K, V>
where
    T: 'static,
    K: Hash + Eq + Clone + Debug + 'static,
    V: Mountable,
{
    /// Keys currently mounted, in render order.
    pub fn keys(&self) -> Vec<K> {
        self.state.borrow().keyed.keys().cloned().collect()
    }
}

impl<T, K, V> Mountable for ForEach<T, K, V>
where
    T: 'static,
    K: Hash + Eq + Clone + Debug + 'static,
    V: Mountable,
{
    type Node = ForEachNode<T, K, V>;

    fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> Self::Node {
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<ForEachState<T, K, V>>>| {
            let weak = weak.clone();
            let function = AnyFunctionNode::new(tx.runtime(), ctx.function_depth(), move |tx| {
                if let Some(state) = weak.upgrade() {
                    ForEachState::run(&state, tx);
                }
            });
            RefCell::new(ForEachState {
                source: self,
                keyed: KeyedNode::new(ctx.container().clone()),
                context: ctx.nested_in_function(),
                function,
                session: None,
                unmounted: false,
            })
        });
        tx.add_function(&state.borrow().function);
        ForEachNode { state }
    }

    fn patch_node(self, node: &mut Self::Node, tx: &mut Transaction) {
        let function = {
            let mut state = node.state.borrow_mut();
            state.source = self;
            state.function.clone()
        };
        tx.add_function(&function);
    }
}

impl<T, K, V> MountedNode for ForEachNode<T, K, V>
where
    T: 'static,
    K: Hash + Eq + Clone + Debug + 'static,
    V: Mountable,
{
    fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
        self.state.borrow_mut().keyed.collect_children(pass, ctx);
    }

    fn apply(&mut self, op: ReconcileOp, tx: &mut Transaction) {
        self.state.borrow_mut().keyed.apply(op, tx);
    }

    fn unmount(&mut self, tx: &mut Transaction) {
        let mut state = self.state.borrow_mut();
        state.unmounted = true;
        drop(state.session.take());
        tx.cancel_function(state.function.id());
        state.keyed.unmount(tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Runtime;
    use crate::pipeline::mount;
    use crate::primitives::{Text, element, text};
    use crate::reactive::StateCell;
    use crate::renderer::Mutation;
    use std::cell::Cell;

    fn root(rt: &Runtime) -> taffy::NodeId {
        rt.node_tree().create_element("div").unwrap()
    }

    // =========================================================================
    // show() tests
    // =========================================================================

    #[test]
    fn test_show_renders_then_when_true() {
        let rt = Runtime::new();
        let root = root(&rt);
        let view = show(|| true, || text("Visible"), None::<fn() -> Text>);

        let _handle = mount(&rt, root, view).unwrap();

        assert_eq!(rt.node_tree().render(root), "<div>Visible</div>");
    }

    #[test]
    fn test_show_renders_else_when_false() {
        let rt = Runtime::new();
        let root = root(&rt);
        let view = show(|| false, || text("Then"), Some(|| text("Else")));

        let _handle = mount(&rt, root, view).unwrap();

        assert_eq!(rt.node_tree().render(root), "<div>Else</div>");
    }

    #[test]
    fn test_show_toggles_components() {
        let rt = Runtime::new();
        let root = root(&rt);
        let visible = StateCell::new(&rt, true);

        let flag = visible.clone();
        let view = show(move || flag.get(), || element("b", text("on")), Some(|| text("off")));
        let _handle = mount(&rt, root, view).unwrap();
        assert_eq!(rt.node_tree().render(root), "<div><b>on</b></div>");

        visible.set(false);
        assert_eq!(rt.node_tree().render(root), "<div>off</div>");

        visible.set(true);
        assert_eq!(rt.node_tree().render(root), "<div><b>on</b></div>");
    }

    #[test]
    fn test_show_no_change_no_recreate() {
        let rt = Runtime::new();
        let root = root(&rt);
        let visible = StateCell::new(&rt, true);
        let builds = Rc::new(Cell::new(0));

        let (flag, counter) = (visible.clone(), builds.clone());
        let view = show(
            move || flag.get(),
            move || {
                counter.set(counter.get() + 1);
                element("b", ())
            },
            None::<fn() -> Text>,
        );
        let _handle = mount(&rt, root, view).unwrap();
        rt.node_tree().take_mutations();

        visible.set(true);

        assert_eq!(builds.get(), 2);
        assert!(rt.node_tree().take_mutations().is_empty());
    }

    #[test]
    fn test_show_no_else() {
        let rt = Runtime::new();
        let root = root(&rt);
        let visible = StateCell::new(&rt, true);

        let flag = visible.clone();
        let view = show(move || flag.get(), || text("x"), None::<fn() -> Text>);
        let _handle = mount(&rt, root, view).unwrap();

        visible.set(false);
        assert_eq!(rt.node_tree().render(root), "<div></div>");
    }

    #[test]
    fn test_show_cleanup_destroys_all() {
        let rt = Runtime::new();
        let root = root(&rt);
        let visible = StateCell::new(&rt, true);

        let flag = visible.clone();
        let view = show(move || flag.get(), || element("p", text("x")), None::<fn() -> Text>);
        let handle = mount(&rt, root, view).unwrap();
        let before = rt.node_tree().node_count();

        handle.unmount().unwrap();

        assert_eq!(rt.node_tree().node_count(), before - 2);
        assert_eq!(rt.observer_count(visible.key()), 0);
    }

    // =========================================================================
    // each() tests
    // =========================================================================

    fn list_view(items: &StateCell<Vec<&'static str>>) -> impl Mountable {
        let items = items.clone();
        element(
            "ul",
            each(move || items.get(), |item| *item, |item| element("li", text(*item))),
        )
    }

    #[test]
    fn test_each_renders_all_items() {
        let rt = Runtime::new();
        let root = root(&rt);
        let items = StateCell::new(&rt, vec!["a", "b", "c"]);

        let _handle = mount(&rt, root, list_view(&items)).unwrap();

        assert_eq!(
            rt.node_tree().render(root),
            "<div><ul><li>a</li><li>b</li><li>c</li></ul></div>"
        );
    }

    #[test]
    fn test_each_empty_list() {
        let rt = Runtime::new();
        let root = root(&rt);
        let items = StateCell::new(&rt, Vec::new());

        let _handle = mount(&rt, root, list_view(&items)).unwrap();

        assert_eq!(rt.node_tree().render(root), "<div><ul></ul></div>");
    }

    #[test]
    fn test_each_adds_and_removes_items() {
        let rt = Runtime::new();
        let root = root(&rt);
        let items = StateCell::new(&rt, vec!["a", "b"]);
        let _handle = mount(&rt, root, list_view(&items)).unwrap();

        items.set(vec!["b", "c"]);

        assert_eq!(
            rt.node_tree().render(root),
            "<div><ul><li>b</li><li>c</li></ul></div>"
        );
    }

    #[test]
    fn test_each_reorder_preserves_components() {
        let rt = Runtime::new();
        let root = root(&rt);
        let items = StateCell::new(&rt, vec!["A", "B", "C"]);
        let _handle = mount(&rt, root, list_view(&items)).unwrap();
        rt.node_tree().take_mutations();

        items.set(vec!["B", "A", "C"]);

        let mutations = rt.node_tree().take_mutations();
        assert_eq!(mutations.len(), 1);
        assert!(matches!(mutations[0], Mutation::Move { index: 1, .. }));
        assert_eq!(
            rt.node_tree().render(root),
            "<div><ul><li>B</li><li>A</li><li>C</li></ul></div>"
        );
    }

    #[test]
    fn test_each_updates_existing_items() {
        let rt = Runtime::new();
        let root = root(&rt);
        let rows = StateCell::new(&rt, vec![(1, "one"), (2, "two")]);

        let source = rows.clone();
        let view = each(
            move || source.get(),
            |row| row.0,
            |row| element("li", text(row.1)),
        );
        let _handle = mount(&rt, root, view).unwrap();
        rt.node_tree().take_mutations();

        rows.set(vec![(1, "uno"), (2, "two")]);

        let mutations = rt.node_tree().take_mutations();
        assert_eq!(mutations.len(), 1);
        assert!(matches!(&mutations[0], Mutation::SetText { text, .. } if text == "uno"));
    }

    #[test]
    fn test_each_duplicate_key_no_crash() {
        let rt = Runtime::new();
        let root = root(&rt);
        let items = StateCell::new(&rt, vec!["a", "a", "b"]);

        let _handle = mount(&rt, root, list_view(&items)).unwrap();

        assert_eq!(
            rt.node_tree().render(root),
            "<div><ul><li>a</li><li>b</li></ul></div>"
        );
    }

    #[test]
    fn test_each_nested_lists_rerun_parent_first() {
        let rt = Runtime::new();
        let root = root(&rt);
        let groups = StateCell::new(&rt, vec![1u32, 2]);
        let size = StateCell::new(&rt, 1u32);

        let (outer, inner_size) = (groups.clone(), size.clone());
        let view = each(
            move || outer.get(),
            |g| *g,
            move |g| {
                let group = *g;
                let size = inner_size.clone();
                element(
                    "ol",
                    each(
                        move || (0..size.get()).map(|i| group * 10 + i).collect::<Vec<u32>>(),
                        |n| *n,
                        |n| text(n.to_string()),
                    ),
                )
            },
        );
        let _handle = mount(&rt, root, view).unwrap();
        assert_eq!(rt.node_tree().render(root), "<div><ol>10</ol><ol>20</ol></div>");

        rt.batch(|| {
            size.set(2);
            groups.set(vec![2]);
        })
        .unwrap();

        assert_eq!(rt.node_tree().render(root), "<div><ol>2021</ol></div>");
    }
}
