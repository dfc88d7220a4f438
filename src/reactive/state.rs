//! State - Observable values and per-component state storage.
//!
//! [`StateCell<T>`] is one observable value: reads are tracked, writes open a
//! transaction and invalidate every session that read it. Clones share the
//! same value.
//!
//! [`ViewStateStorage`] is the slot table of one component instance. All of
//! its slots share a single registrar, each slot index doubling as the
//! property id. A component initializes its slots on first mount and restores
//! them by index on later renders.
//!
//! # Example
//!
//! ```ignore
//! let storage = ViewStateStorage::new(&runtime, 2);
//! let count = storage.initialize(0, 0u32)?;
//! let name = storage.initialize(1, String::from("ada"))?;
//!
//! // later render
//! let count: StateCell<u32> = storage.state(0).unwrap();
//! count.update(|n| *n += 1);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::binding::Binding;
use super::registrar::{PropertyId, PropertyKey, Registrar};
use crate::diagnostics::usage_error;
use crate::engine::Runtime;

// =============================================================================
// STATE CELL
// =============================================================================

pub(crate) struct StateInner<T> {
    registrar: Registrar,
    property: PropertyId,
    value: RefCell<T>,
}

pub struct StateCell<T> {
    inner: Rc<StateInner<T>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("key", &self.inner.registrar.key(self.inner.property))
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

impl<T: 'static> StateCell<T> {
    /// A standalone cell with its own registrar.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self::with_registrar(Registrar::new(runtime), PropertyId(0), value)
    }

    pub fn with_registrar(registrar: Registrar, property: PropertyId, value: T) -> Self {
        Self {
            inner: Rc::new(StateInner {
                registrar,
                property,
                value: RefCell::new(value),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<StateInner<T>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<StateInner<T>> {
        Rc::downgrade(&self.inner)
    }

    pub fn key(&self) -> PropertyKey {
        self.inner.registrar.key(self.inner.property)
    }

    /// Tracked read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Tracked read by reference.
    ///
    /// Writes to this cell from inside `f` are ignored and reported.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.registrar.access(self.inner.property);
        f(&self.inner.value.borrow())
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    pub fn set(&self, value: T) {
        if self.is_borrowed() {
            return;
        }
        self.inner.registrar.mutate(self.inner.property, || {
            let previous = self.inner.value.replace(value);
            drop(previous);
        });
    }

    /// Write only when the value differs. Returns whether a write happened.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        if *self.inner.value.borrow() == value {
            return false;
        }
        self.set(value);
        true
    }

    /// Mutate in place.
    ///
    /// `f` holds the value mutably: reading this cell from inside it panics,
    /// and nested writes are ignored and reported.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        if self.is_borrowed() {
            return;
        }
        self.inner.registrar.mutate(self.inner.property, || {
            f(&mut self.inner.value.borrow_mut());
        });
    }

    fn is_borrowed(&self) -> bool {
        let borrowed = self.inner.value.try_borrow_mut().is_err();
        if borrowed {
            usage_error(format_args!(
                "state {:?} written while it is being read or updated, ignoring the write",
                self.key()
            ));
        }
        borrowed
    }

    /// A non-owning two-way handle to this cell.
    pub fn binding(&self) -> Binding<T> {
        Binding::new(self)
    }
}

// =============================================================================
// VIEW STATE STORAGE
// =============================================================================

/// Slot table for one component instance.
pub struct ViewStateStorage {
    registrar: Registrar,
    slots: RefCell<Vec<Option<Box<dyn Any>>>>,
}

impl fmt::Debug for ViewStateStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewStateStorage")
            .field("registrar", &self.registrar.id())
            .field("slots", &self.slots.borrow().len())
            .finish()
    }
}

impl ViewStateStorage {
    pub fn new(runtime: &Runtime, slot_count: usize) -> Self {
        Self {
            registrar: Registrar::new(runtime),
            slots: RefCell::new((0..slot_count).map(|_| None).collect()),
        }
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    pub fn slot_count(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Create the state cell for slot `index`.
    ///
    /// Returns `None` (and reports it) if `index` does not fit a property id.
    pub fn initialize<T: 'static>(&self, index: usize, value: T) -> Option<StateCell<T>> {
        let Ok(property) = u32::try_from(index) else {
            usage_error(format_args!("state slot {index} is out of the property id range"));
            return None;
        };
        let cell = StateCell::with_registrar(self.registrar.clone(), PropertyId(property), value);
        self.initialize_slot(index, cell.clone());
        Some(cell)
    }

    /// Store an arbitrary cloneable storage object (focus state, bindings) in a slot.
    pub fn initialize_slot<S: Clone + 'static>(&self, index: usize, storage: S) {
        let mut slots = self.slots.borrow_mut();
        if index >= slots.len() {
            slots.resize_with(index + 1, || None);
        }
        if slots[index].is_some() {
            usage_error(format_args!("state slot {index} initialized twice, replacing it"));
        }
        slots[index] = Some(Box::new(storage));
    }

    /// Restore the state cell stored at `index`.
    pub fn state<T: 'static>(&self, index: usize) -> Option<StateCell<T>> {
        self.slot::<StateCell<T>>(index)
    }

    pub fn slot<S: Clone + 'static>(&self, index: usize) -> Option<S> {
        let slots = self.slots.borrow();
        let Some(Some(slot)) = slots.get(index) else {
            usage_error(format_args!("state slot {index} read before it was initialized"));
            return None;
        };
        match slot.downcast_ref::<S>() {
            Some(storage) => Some(storage.clone()),
            None => {
                usage_error(format_args!(
                    "state slot {index} holds a different type than {}",
                    std::any::type_name::<S>()
                ));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tracing_test::traced_test;

    #[test]
    fn test_get_set_update() {
        let rt = Runtime::new();
        let cell = StateCell::new(&rt, 1);

        cell.set(2);
        cell.update(|v| *v *= 10);

        assert_eq!(cell.get(), 20);
        assert_eq!(cell.with(|v| *v + 1), 21);
    }

    #[test]
    fn test_set_notifies_observers_once() {
        let rt = Runtime::new();
        let cell = StateCell::new(&rt, "a".to_string());
        let fired = Rc::new(Cell::new(0));

        let hook = fired.clone();
        let (value, _session) = rt.track(|| cell.get(), move || hook.set(hook.get() + 1));
        assert_eq!(value, "a");

        cell.set("b".into());
        cell.set("c".into());
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_set_if_changed_skips_equal_values() {
        let rt = Runtime::new();
        let cell = StateCell::new(&rt, 5);
        let fired = Rc::new(Cell::new(0));

        let hook = fired.clone();
        let ((), _session) = rt.track(|| { cell.get(); }, move || hook.set(hook.get() + 1));

        assert!(!cell.set_if_changed(5));
        assert_eq!(fired.get(), 0);
        assert!(cell.set_if_changed(6));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_untracked_read_does_not_subscribe() {
        let rt = Runtime::new();
        let cell = StateCell::new(&rt, 0);

        let ((), _session) = rt.track(|| { cell.get_untracked(); }, || {});

        assert_eq!(rt.observer_count(cell.key()), 0);
    }

    #[test]
    fn test_storage_slots_share_registrar() {
        let rt = Runtime::new();
        let storage = ViewStateStorage::new(&rt, 2);
        let a = storage.initialize(0, 1u8).unwrap();
        let b = storage.initialize(1, "x").unwrap();

        assert_eq!(a.key().registrar, b.key().registrar);
        assert_eq!(b.key().property, PropertyId(1));
    }

    #[test]
    fn test_storage_restores_by_index() {
        let rt = Runtime::new();
        let storage = ViewStateStorage::new(&rt, 1);
        storage.initialize(0, 41u32).unwrap().set(42);

        let restored: StateCell<u32> = storage.state(0).unwrap();
        assert_eq!(restored.get(), 42);
    }

    #[test]
    #[traced_test]
    fn test_storage_type_mismatch_is_reported() {
        let rt = Runtime::new();
        let storage = ViewStateStorage::new(&rt, 1);
        storage.initialize(0, 1u32).unwrap();

        assert!(storage.state::<String>(0).is_none());
        assert!(logs_contain("holds a different type"));
    }

    #[test]
    #[traced_test]
    fn test_write_inside_read_is_ignored() {
        let rt = Runtime::new();
        let cell = StateCell::new(&rt, 1);
        let fired = Rc::new(Cell::new(0));
        let hook = fired.clone();
        let ((), _session) = rt.track(|| { cell.get(); }, move || hook.set(hook.get() + 1));

        let seen = cell.with(|v| {
            cell.set(*v + 1);
            cell.update(|v| *v += 1);
            *v
        });

        assert_eq!(seen, 1);
        assert_eq!(cell.get(), 1);
        assert_eq!(fired.get(), 0);
        assert!(logs_contain("written while it is being read or updated"));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[traced_test]
    fn test_storage_index_beyond_property_range_is_reported() {
        let rt = Runtime::new();
        let storage = ViewStateStorage::new(&rt, 1);

        assert!(storage.initialize(u32::MAX as usize + 1, 0u8).is_none());
        assert_eq!(storage.slot_count(), 1);
        assert!(logs_contain("out of the property id range"));
    }

    #[test]
    #[traced_test]
    fn test_storage_uninitialized_slot_is_reported() {
        let rt = Runtime::new();
        let storage = ViewStateStorage::new(&rt, 1);

        assert!(storage.state::<u32>(0).is_none());
        assert!(logs_contain("read before it was initialized"));
    }
}
