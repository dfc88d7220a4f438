//! Registrar - Per-owner access and mutation notification.
//!
//! Every piece of observable state belongs to a registrar and is named by a
//! [`PropertyId`] inside it. Reads call [`Registrar::access`]; writes are
//! bracketed by [`Registrar::will_set`] / [`Registrar::did_set`]. The pair
//! together form a [`PropertyKey`], the unit the tracking layer observes.
//!
//! A registrar holds its runtime weakly. Once the runtime is gone, every call
//! is a no-op and [`Registrar::mutate`] just runs the mutation.

use crate::engine::{Runtime, WeakRuntime};

/// Slot identity inside one registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrarId(u64);

/// Globally unique name of one observable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyKey {
    pub registrar: RegistrarId,
    pub property: PropertyId,
}

#[derive(Debug, Clone)]
pub struct Registrar {
    id: RegistrarId,
    runtime: WeakRuntime,
}

impl Registrar {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            id: RegistrarId(runtime.next_id()),
            runtime: runtime.downgrade(),
        }
    }

    pub fn id(&self) -> RegistrarId {
        self.id
    }

    pub fn runtime(&self) -> Option<Runtime> {
        self.runtime.upgrade()
    }

    pub fn key(&self, property: PropertyId) -> PropertyKey {
        PropertyKey {
            registrar: self.id,
            property,
        }
    }

    /// Record a read of `property` into the current tracking session.
    pub fn access(&self, property: PropertyId) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.record_access(self.key(property));
        }
    }

    pub fn will_set(&self, property: PropertyId) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.will_set(self.key(property));
        }
    }

    /// Finish a mutation and fire every armed session observing `property`.
    pub fn did_set(&self, property: PropertyId) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.did_set(self.key(property));
        }
    }

    /// Run `mutation` bracketed by `will_set`/`did_set`.
    ///
    /// Opens an implicit transaction when none is active, so dependents rerun
    /// and commit before this returns.
    pub fn mutate<R>(&self, property: PropertyId, mutation: impl FnOnce() -> R) -> R {
        let Some(rt) = self.runtime.upgrade() else {
            return mutation();
        };
        let key = self.key(property);
        rt.write(|| {
            rt.will_set(key);
            let value = mutation();
            rt.did_set(key);
            value
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_keys_are_distinct_per_registrar() {
        let rt = Runtime::new();
        let a = Registrar::new(&rt);
        let b = Registrar::new(&rt);

        assert_ne!(a.key(PropertyId(0)), b.key(PropertyId(0)));
        assert_eq!(a.key(PropertyId(1)), a.clone().key(PropertyId(1)));
    }

    #[test]
    fn test_mutate_opens_transaction() {
        let rt = Runtime::new();
        let registrar = Registrar::new(&rt);
        let inside = Rc::new(Cell::new(false));

        let flag = inside.clone();
        let probe = rt.clone();
        let value = registrar.mutate(PropertyId(0), move || {
            flag.set(probe.in_transaction());
            7
        });

        assert_eq!(value, 7);
        assert!(inside.get());
        assert!(!rt.in_transaction());
    }

    #[test]
    fn test_orphaned_registrar_still_mutates() {
        let rt = Runtime::new();
        let registrar = Registrar::new(&rt);
        drop(rt);

        registrar.access(PropertyId(0));
        assert_eq!(registrar.mutate(PropertyId(0), || 3), 3);
        assert!(registrar.runtime().is_none());
    }
}
