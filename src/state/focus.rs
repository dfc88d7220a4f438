//! Focus System - Bindings between focus state and focusable elements
//!
//! A focus state holds the value describing which element should have
//! focus, or its none-value when nothing should:
//! - [`FocusState<bool>`] for a single element (`true` = focused)
//! - [`FocusState<Option<K>>`] for several elements, one key each
//!
//! Elements opt in with [`Element::focused`], which mounts a
//! [`FocusModifier`]. At commit the modifier registers its element with the
//! storage under its key and listens to the node's focus and blur events.
//!
//! State and real focus are kept consistent in both directions:
//! - Writing the state (`set`) asks the registered element to focus or blur;
//!   the state changes when the resulting event is reported back.
//! - A focus/blur event from the node tree reports the new value directly.
//!
//! # Example
//!
//! ```ignore
//! use spark_ui::state::FocusState;
//!
//! #[derive(Clone, PartialEq, Eq, Hash, Debug)]
//! enum Field { Name, Email }
//!
//! let focus = FocusState::<Option<Field>>::keyed(&runtime);
//!
//! let view = element("form", (
//!     element("input", ()).focused(focus.binding_for(Field::Name)),
//!     element("input", ()).focused(focus.binding_for(Field::Email)),
//! ));
//!
//! // Move focus to the email field
//! focus.set(Some(Field::Email));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use taffy::NodeId;

use crate::diagnostics::{invariant_violation, usage_error};
use crate::engine::{CommitContext, Runtime, Transaction, WeakRuntime};
use crate::primitives::{Element, ElementModifier, Mountable};
use crate::reactive::StateCell;
use crate::renderer::{FocusAccessor, FocusEvent};

/// Values a focus state can hold.
pub trait FocusValue: Clone + Eq + Hash + Debug + 'static {}

impl<T: Clone + Eq + Hash + Debug + 'static> FocusValue for T {}

// =============================================================================
// FOCUSABLE TARGETS
// =============================================================================

/// Something that can be asked to take or give up focus.
pub trait Focusable {
    fn focus(&self);
    fn blur(&self);
}

/// Identity of one registration. Never reused within a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FocusableId(u64);

impl FocusableId {
    pub fn new(runtime: &Runtime) -> Self {
        Self(runtime.next_id())
    }
}

struct FocusTarget {
    id: FocusableId,
    target: Weak<dyn Focusable>,
}

// =============================================================================
// FOCUS STORAGE
// =============================================================================

pub struct FocusStateStorage<V> {
    runtime: WeakRuntime,
    value: StateCell<V>,
    none_value: V,
    focusables: RefCell<HashMap<V, FocusTarget>>,
}

impl<V: FocusValue> FocusStateStorage<V> {
    pub fn new(runtime: &Runtime, none_value: V) -> Self {
        Self {
            runtime: runtime.downgrade(),
            value: StateCell::new(runtime, none_value.clone()),
            none_value,
            focusables: RefCell::new(HashMap::new()),
        }
    }

    /// Current value (tracked).
    pub fn value(&self) -> V {
        self.value.get()
    }

    pub fn value_untracked(&self) -> V {
        self.value.get_untracked()
    }

    pub fn none_value(&self) -> &V {
        &self.none_value
    }

    fn live_target(&self, key: &V) -> Option<Rc<dyn Focusable>> {
        self.focusables
            .borrow()
            .get(key)
            .and_then(|entry| entry.target.upgrade())
    }

    /// Ask the element registered for `desired` to take focus, or, for the
    /// none-value, ask the focused element to give it up.
    ///
    /// The value itself changes when the element reports the event back. A
    /// real key without a registered element is a usage error and is ignored.
    pub fn try_focus(&self, desired: V) {
        let runtime = match self.runtime.try_upgrade() {
            Ok(runtime) => runtime,
            Err(error) => {
                usage_error(format_args!("focus change ignored: {error}"));
                return;
            }
        };
        if let Err(error) = runtime.batch(|| self.focus_now(desired)) {
            tracing::error!(%error, "focus transaction failed");
        }
    }

    fn focus_now(&self, desired: V) {
        if desired == self.none_value {
            let current = self.value.get_untracked();
            if current == self.none_value {
                return;
            }
            match self.live_target(&current) {
                Some(target) => target.blur(),
                None => {
                    self.value.set(self.none_value.clone());
                }
            }
            return;
        }

        match self.live_target(&desired) {
            Some(target) => target.focus(),
            None => usage_error(format_args!(
                "no focusable registered for {desired:?}, focus unchanged"
            )),
        }
    }

    /// The element registered under `key` gained focus.
    pub fn report_focus(&self, key: V) {
        if key == self.none_value {
            return;
        }
        self.value.set_if_changed(key);
    }

    /// The element registered under `key` lost focus. Ignored unless `key`
    /// is the current value.
    pub fn report_blur(&self, key: V) {
        if self.value.get_untracked() == key {
            self.value.set_if_changed(self.none_value.clone());
        }
    }

    /// Register `target` for `key`. Returns false if another live target
    /// already holds the key; that first registration is kept.
    pub fn register_focusable(&self, key: V, id: FocusableId, target: Weak<dyn Focusable>) -> bool {
        if key == self.none_value {
            invariant_violation(
                self.runtime.upgrade().as_ref(),
                format_args!("focusable registered for the none value {key:?}"),
            );
            return false;
        }

        let mut table = self.focusables.borrow_mut();
        if let Some(existing) = table.get(&key) {
            if existing.id == id {
                return true;
            }
            if existing.target.strong_count() > 0 {
                usage_error(format_args!(
                    "multiple views registered for focus value {key:?}, keeping the first"
                ));
                return false;
            }
        }
        tracing::trace!(?key, ?id, "focusable registered");
        table.insert(key, FocusTarget { id, target });
        true
    }

    /// Remove the registration of `key` if it belongs to `id`. Unregistering
    /// the focused element resets the value to none.
    pub fn unregister_focusable(&self, key: &V, id: FocusableId) -> bool {
        let removed = {
            let mut table = self.focusables.borrow_mut();
            match table.get(key) {
                Some(entry) if entry.id == id => table.remove(key).is_some(),
                _ => false,
            }
        };
        if !removed {
            tracing::debug!(?key, ?id, "stale focusable unregistration ignored");
            return false;
        }

        if self.value.get_untracked() == *key {
            self.value.set(self.none_value.clone());
        }
        true
    }

    pub fn registered_count(&self) -> usize {
        self.focusables.borrow().len()
    }

    pub fn is_registered(&self, key: &V, id: FocusableId) -> bool {
        self.focusables
            .borrow()
            .get(key)
            .is_some_and(|entry| entry.id == id)
    }
}

// =============================================================================
// FOCUS STATE
// =============================================================================

/// Owning handle to a focus storage.
pub struct FocusState<V> {
    storage: Rc<FocusStateStorage<V>>,
}

impl<V> Clone for FocusState<V> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl FocusState<bool> {
    /// Focus state of a single element.
    pub fn new(runtime: &Runtime) -> Self {
        Self::with_none_value(runtime, false)
    }

    pub fn binding(&self) -> FocusBinding<bool> {
        self.binding_to(true)
    }
}

impl<K: FocusValue> FocusState<Option<K>> {
    /// Focus state shared by several elements, one key each.
    pub fn keyed(runtime: &Runtime) -> Self {
        Self::with_none_value(runtime, None)
    }

    pub fn binding_for(&self, key: K) -> FocusBinding<Option<K>> {
        self.binding_to(Some(key))
    }
}

impl<V: FocusValue> FocusState<V> {
    pub fn with_none_value(runtime: &Runtime, none_value: V) -> Self {
        Self {
            storage: Rc::new(FocusStateStorage::new(runtime, none_value)),
        }
    }

    /// Binding that is focused while the state equals `value`.
    pub fn binding_to(&self, value: V) -> FocusBinding<V> {
        FocusBinding {
            storage: Rc::downgrade(&self.storage),
            value,
        }
    }

    pub fn get(&self) -> V {
        self.storage.value()
    }

    pub fn set(&self, value: V) {
        self.storage.try_focus(value);
    }

    pub fn storage(&self) -> &Rc<FocusStateStorage<V>> {
        &self.storage
    }
}

// =============================================================================
// FOCUS BINDING
// =============================================================================

/// Non-owning link from one element to a focus state, for one value.
pub struct FocusBinding<V> {
    storage: Weak<FocusStateStorage<V>>,
    value: V,
}

impl<V: Clone> Clone for FocusBinding<V> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            value: self.value.clone(),
        }
    }
}

impl<V: FocusValue> FocusBinding<V> {
    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn same_storage(&self, other: &FocusBinding<V>) -> bool {
        Weak::ptr_eq(&self.storage, &other.storage)
    }

    fn register(&self, id: FocusableId, target: Weak<dyn Focusable>) -> bool {
        match self.storage.upgrade() {
            Some(storage) => storage.register_focusable(self.value.clone(), id, target),
            None => {
                usage_error(format_args!("focus binding outlived its focus state"));
                false
            }
        }
    }

    fn unregister(&self, id: FocusableId) {
        if let Some(storage) = self.storage.upgrade() {
            storage.unregister_focusable(&self.value, id);
        }
    }

    /// Events from an element whose registration was rejected are ignored.
    fn report_focus(&self, id: FocusableId) {
        if let Some(storage) = self.storage.upgrade() {
            if storage.is_registered(&self.value, id) {
                storage.report_focus(self.value.clone());
            }
        }
    }

    fn report_blur(&self, id: FocusableId) {
        if let Some(storage) = self.storage.upgrade() {
            if storage.is_registered(&self.value, id) {
                storage.report_blur(self.value.clone());
            }
        }
    }
}

// =============================================================================
// FOCUS MODIFIER
// =============================================================================

struct ModifierTarget {
    accessor: FocusAccessor,
}

impl Focusable for ModifierTarget {
    fn focus(&self) {
        self.accessor.focus();
    }

    fn blur(&self) {
        self.accessor.blur();
    }
}

/// Element modifier connecting the element's node to a focus binding.
pub struct FocusModifier<V> {
    binding: Rc<RefCell<FocusBinding<V>>>,
    id: Option<FocusableId>,
    target: Option<Rc<ModifierTarget>>,
    registered: bool,
}

impl<V: FocusValue> FocusModifier<V> {
    pub fn new(binding: FocusBinding<V>) -> Self {
        Self {
            binding: Rc::new(RefCell::new(binding)),
            id: None,
            target: None,
            registered: false,
        }
    }

    fn current_binding(&self) -> FocusBinding<V> {
        self.binding.borrow().clone()
    }

    fn weak_target(&self) -> Option<Weak<dyn Focusable>> {
        self.target.as_ref().map(|target| {
            let weak: Weak<dyn Focusable> = Rc::downgrade(target) as Weak<dyn Focusable>;
            weak
        })
    }
}

impl<V: FocusValue> ElementModifier for FocusModifier<V> {
    fn mount(&mut self, node: NodeId, ctx: &mut CommitContext) {
        if self.target.is_some() {
            invariant_violation(Some(ctx.runtime()), format_args!("focus modifier mounted twice"));
            return;
        }

        let id = FocusableId::new(ctx.runtime());
        let shared = self.binding.clone();
        let accessor = FocusAccessor::new(ctx.tree(), node, move |event| {
            let binding = shared.borrow().clone();
            match event {
                FocusEvent::Focus => binding.report_focus(id),
                FocusEvent::Blur => binding.report_blur(id),
            }
        });
        let accessor = match accessor {
            Ok(accessor) => accessor,
            Err(error) => {
                tracing::error!(?node, %error, "failed to attach focus accessor");
                return;
            }
        };

        self.id = Some(id);
        self.target = Some(Rc::new(ModifierTarget { accessor }));
        if let Some(weak) = self.weak_target() {
            self.registered = self.current_binding().register(id, weak);
        }
    }

    fn update(&mut self, next: Box<dyn Any>, tx: &mut Transaction) {
        let next = match next.downcast::<FocusModifier<V>>() {
            Ok(next) => next.current_binding(),
            Err(_) => {
                usage_error(format_args!("focus modifier replaced by a different modifier"));
                return;
            }
        };

        let current = self.current_binding();
        if !current.same_storage(&next) {
            usage_error(format_args!(
                "rebinding a focus modifier to a different focus state is not supported"
            ));
            return;
        }
        if current.value == next.value {
            return;
        }

        match (self.id, self.weak_target()) {
            (Some(id), Some(weak)) => {
                if self.registered {
                    current.unregister(id);
                }
                self.registered = next.register(id, weak);
                *self.binding.borrow_mut() = next.clone();

                // The node keeps real focus across the key change.
                let node = self.target.as_ref().map(|target| target.accessor.node());
                if self.registered && node.is_some() && tx.runtime().node_tree().focused() == node {
                    next.report_focus(id);
                }
            }
            _ => *self.binding.borrow_mut() = next,
        }
    }

    fn unmount(&mut self, _ctx: &mut CommitContext) {
        if let (true, Some(id)) = (self.registered, self.id) {
            self.current_binding().unregister(id);
        }
        self.registered = false;
        self.target = None;
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<C: Mountable> Element<C> {
    /// Give this element focus while the bound state equals the binding's value.
    pub fn focused<V: FocusValue>(self, binding: FocusBinding<V>) -> Self {
        self.modifier(FocusModifier::new(binding))
    }
}

// =============================================================================
// Tests
// =============================================================================
