//! Runtime - The single-threaded context every reactive object belongs to.
//!
//! A [`Runtime`] owns:
//! - the tracking state (session stack, observer table)
//! - the scheduler state (pending function nodes, dirty containers, commit actions)
//! - the [`NodeTree`] that commits write into
//!
//! Handles are cheap `Rc` clones. Long-lived callbacks and registrars hold a
//! [`WeakRuntime`] so they never keep a runtime alive on their own.
//!
//! Tracking operations live in `reactive::tracking` and transaction operations
//! in `engine::scheduler`; both are `impl Runtime` blocks.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::registry::IdRegistry;
use super::scheduler::SchedulerState;
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::reactive::tracking::TrackingState;
use crate::renderer::NodeTree;

pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) tracking: RefCell<TrackingState>,
    pub(crate) scheduler: RefCell<SchedulerState>,
    pub(crate) ids: IdRegistry,
    pub(crate) tree: NodeTree,
}

#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_tree(config, NodeTree::new())
    }

    /// Build a runtime that commits into an existing tree.
    pub fn with_tree(config: RuntimeConfig, tree: NodeTree) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                tracking: RefCell::new(TrackingState::default()),
                scheduler: RefCell::new(SchedulerState::default()),
                ids: IdRegistry::default(),
                tree,
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn node_tree(&self) -> &NodeTree {
        &self.inner.tree
    }

    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.inner.ids.allocate()
    }
}

/// Non-owning runtime handle.
#[derive(Clone, Default)]
pub struct WeakRuntime {
    inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.inner.upgrade().map(|inner| Runtime { inner })
    }

    /// Like [`WeakRuntime::upgrade`], failing with [`Error::RuntimeDropped`].
    pub fn try_upgrade(&self) -> Result<Runtime> {
        self.upgrade().ok_or(Error::RuntimeDropped)
    }
}

impl fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRuntime")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
