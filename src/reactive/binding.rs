//! Binding - Non-owning two-way access to a state cell.
//!
//! A binding lets a child read and write state owned by a parent without
//! keeping it alive. Reads are tracked like reads of the cell itself. Once the
//! owner drops the cell, reads return `None` and writes are dropped with a
//! warning.

use std::fmt;
use std::rc::Weak;

use super::state::{StateCell, StateInner};
use crate::diagnostics::usage_error;

pub struct Binding<T> {
    cell: Weak<StateInner<T>>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("alive", &(self.cell.strong_count() > 0))
            .finish()
    }
}

impl<T: 'static> Binding<T> {
    pub(crate) fn new(cell: &StateCell<T>) -> Self {
        Self {
            cell: cell.downgrade(),
        }
    }

    fn cell(&self) -> Option<StateCell<T>> {
        self.cell.upgrade().map(StateCell::from_inner)
    }

    pub fn is_alive(&self) -> bool {
        self.cell.strong_count() > 0
    }

    /// Whether both bindings point at the same state cell.
    pub fn same_storage(&self, other: &Binding<T>) -> bool {
        Weak::ptr_eq(&self.cell, &other.cell)
    }

    /// Tracked read. `None` once the owning state is gone.
    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.cell().map(|cell| cell.get())
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.cell().map(|cell| cell.with(f))
    }

    /// Write through to the owner. Returns false if the owner is gone.
    pub fn set(&self, value: T) -> bool {
        match self.cell() {
            Some(cell) => {
                cell.set(value);
                true
            }
            None => {
                usage_error(format_args!("write through a binding whose state was dropped"));
                false
            }
        }
    }

    /// Write only when the value differs. Returns whether a write happened.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        match self.cell() {
            Some(cell) => cell.set_if_changed(value),
            None => {
                usage_error(format_args!("write through a binding whose state was dropped"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Runtime;
    use tracing_test::traced_test;

    #[test]
    fn test_binding_writes_through() {
        let rt = Runtime::new();
        let cell = StateCell::new(&rt, 1);
        let binding = cell.binding();

        assert!(binding.set(2));
        assert_eq!(cell.get(), 2);
        assert_eq!(binding.get(), Some(2));
    }

    #[test]
    fn test_binding_read_is_tracked() {
        let rt = Runtime::new();
        let cell = StateCell::new(&rt, 0);
        let binding = cell.binding();

        let (_, _session) = rt.track(|| binding.get(), || {});

        assert_eq!(rt.observer_count(cell.key()), 1);
    }

    #[test]
    #[traced_test]
    fn test_binding_outliving_owner() {
        let rt = Runtime::new();
        let cell = StateCell::new(&rt, 0);
        let binding = cell.binding();
        drop(cell);

        assert!(!binding.is_alive());
        assert_eq!(binding.get(), None);
        assert!(!binding.set(3));
        assert!(logs_contain("binding whose state was dropped"));
    }

    #[test]
    fn test_same_storage() {
        let rt = Runtime::new();
        let a = StateCell::new(&rt, 0);
        let b = StateCell::new(&rt, 0);

        assert!(a.binding().same_storage(&a.clone().binding()));
        assert!(!a.binding().same_storage(&b.binding()));
    }
}
