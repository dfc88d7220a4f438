//! Groups - Several views side by side in one container.
//!
//! Tuples of views are views: each member mounts into the enclosing
//! container and reports its nodes in tuple order. `()` renders nothing.
//! [`Group`] wraps a tuple when a named value reads better.

use super::mountable::{Mountable, MountedNode, ReconcileOp, ViewContext};
use crate::engine::{CommitContext, LayoutPass, Transaction};

impl Mountable for () {
    type Node = ();

    fn make_node(self, _ctx: &ViewContext, _tx: &mut Transaction) {}

    fn patch_node(self, _node: &mut (), _tx: &mut Transaction) {}
}

impl MountedNode for () {
    fn collect_children(&mut self, _pass: &mut LayoutPass, _ctx: &mut CommitContext) {}

    fn apply(&mut self, _op: ReconcileOp, _tx: &mut Transaction) {}

    fn unmount(&mut self, _tx: &mut Transaction) {}
}

macro_rules! tuple_views {
    ($($name:ident $index:tt),+) => {
        impl<$($name: Mountable),+> Mountable for ($($name,)+) {
            type Node = ($($name::Node,)+);

            fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> Self::Node {
                ($(self.$index.make_node(ctx, tx),)+)
            }

            fn patch_node(self, node: &mut Self::Node, tx: &mut Transaction) {
                $(self.$index.patch_node(&mut node.$index, tx);)+
            }
        }

        impl<$($name: MountedNode),+> MountedNode for ($($name,)+) {
            fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
                $(self.$index.collect_children(pass, ctx);)+
            }

            fn apply(&mut self, op: ReconcileOp, tx: &mut Transaction) {
                $(self.$index.apply(op, tx);)+
            }

            fn unmount(&mut self, tx: &mut Transaction) {
                $(self.$index.unmount(tx);)+
            }
        }
    };
}

tuple_views!(A 0);
tuple_views!(A 0, B 1);
tuple_views!(A 0, B 1, C 2);
tuple_views!(A 0, B 1, C 2, D 3);
tuple_views!(A 0, B 1, C 2, D 3, E 4);
tuple_views!(A 0, B 1, C 2, D 3, E 4, F 5);

/// A fixed set of views rendered in order.
pub struct Group<C>(pub C);

pub struct GroupNode<N>(N);

pub fn group<C: Mountable>(content: C) -> Group<C> {
    Group(content)
}

impl<C: Mountable> Mountable for Group<C> {
    type Node = GroupNode<C::Node>;

    fn make_node(self, ctx: &ViewContext, tx: &mut Transaction) -> Self::Node {
        GroupNode(self.0.make_node(ctx, tx))
    }

    fn patch_node(self, node: &mut Self::Node, tx: &mut Transaction) {
        self.0.patch_node(&mut node.0, tx);
    }
}

impl<N: MountedNode> MountedNode for GroupNode<N> {
    fn collect_children(&mut self, pass: &mut LayoutPass, ctx: &mut CommitContext) {
        self.0.collect_children(pass, ctx);
    }

    fn apply(&mut self, op: ReconcileOp, tx: &mut Transaction) {
        self.0.apply(op, tx);
    }

    fn unmount(&mut self, tx: &mut Transaction) {
        self.0.unmount(tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Runtime;
    use crate::pipeline::mount;
    use crate::primitives::{element, text};

    #[test]
    fn test_tuple_members_render_in_order() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("p").unwrap();

        let _handle = mount(&rt, root, (text("a"), element("b", "b"), "c")).unwrap();

        assert_eq!(rt.node_tree().render(root), "<p>a<b>b</b>c</p>");
    }

    #[test]
    fn test_group_patches_members_in_place() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("p").unwrap();
        let handle = mount(&rt, root, group((text("x"), text("y")))).unwrap();
        let before = rt.node_tree().children(root).unwrap();

        handle.update(group((text("x"), text("z")))).unwrap();

        assert_eq!(rt.node_tree().children(root).unwrap(), before);
        assert_eq!(rt.node_tree().render(root), "<p>xz</p>");
    }

    #[test]
    fn test_unit_renders_nothing() {
        let rt = Runtime::new();
        let root = rt.node_tree().create_element("p").unwrap();

        let _handle = mount(&rt, root, ()).unwrap();

        assert_eq!(rt.node_tree().render(root), "<p></p>");
    }
}
