//! Input Module - Two-way binding of an input node's value
//!
//! [`Element::bind_value`] keeps an input node's value and a
//! `StateCell<String>` in sync:
//! - state → node: the bound value is written to the node at commit, and
//!   again at the commit of every transaction that changes it
//! - node → state: input events write the typed value back through the
//!   binding, skipping writes that would not change it
//!
//! The echo of a user edit (state changed, node already holds the value) does
//! not touch the node again.
//!
//! # Example
//!
//! ```ignore
//! let name = StateCell::new(&runtime, String::from("Ada"));
//! let view = element("input", ()).bind_value(name.binding());
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use taffy::NodeId;

use crate::diagnostics::usage_error;
use crate::engine::{CommitContext, Transaction};
use crate::primitives::{Element, ElementModifier, Mountable};
use crate::reactive::{Binding, EffectHandle};
use crate::renderer::ValueAccessor;

// =============================================================================
// VALUE MODIFIER
// =============================================================================

pub struct ValueModifier {
    binding: Rc<RefCell<Binding<String>>>,
    accessor: Option<ValueAccessor>,
    sync: Option<EffectHandle>,
}

impl ValueModifier {
    pub fn new(binding: Binding<String>) -> Self {
        Self {
            binding: Rc::new(RefCell::new(binding)),
            accessor: None,
            sync: None,
        }
    }
}

impl ElementModifier for ValueModifier {
    fn mount(&mut self, node: NodeId, ctx: &mut CommitContext) {
        let shared = self.binding.clone();
        let accessor = ValueAccessor::new(ctx.tree(), node, move |value| {
            let binding = shared.borrow().clone();
            binding.set_if_changed(value.to_string());
        });
        match accessor {
            Ok(accessor) => self.accessor = Some(accessor),
            Err(error) => {
                tracing::error!(?node, %error, "failed to attach value accessor");
                return;
            }
        }

        let shared = self.binding.clone();
        self.sync = Some(ctx.runtime().effect_with(0, move |tx| {
            let binding = shared.borrow().clone();
            let Some(value) = binding.get() else {
                return;
            };
            tx.defer_commit(move |ctx| {
                if let Err(error) = ctx.tree().set_value(node, &value) {
                    tracing::debug!(?node, %error, "bound value target is gone");
                }
            });
        }));
    }

    fn update(&mut self, next: Box<dyn Any>, _tx: &mut Transaction) {
        let Ok(next) = next.downcast::<ValueModifier>() else {
            usage_error(format_args!("value modifier replaced by a different modifier"));
            return;
        };
        let next = next.binding.borrow().clone();
        if !self.binding.borrow().same_storage(&next) {
            usage_error(format_args!(
                "rebinding an input value to a different state is not supported"
            ));
        }
    }

    fn unmount(&mut self, _ctx: &mut CommitContext) {
        drop(self.sync.take());
        drop(self.accessor.take());
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<C: Mountable> Element<C> {
    /// Bind this input element's value to a string state.
    pub fn bind_value(self, binding: Binding<String>) -> Self {
        self.modifier(ValueModifier::new(binding))
    }
}
