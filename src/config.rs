//! Runtime configuration.
//!
//! ```ignore
//! use spark_ui::{Runtime, RuntimeConfig, InvariantPolicy};
//!
//! let runtime = Runtime::with_config(
//!     RuntimeConfig::default()
//!         .with_max_reruns_per_node(20)
//!         .with_invariant_policy(InvariantPolicy::Warn),
//! );
//! ```

/// How many times a single function node may rerun inside one transaction
/// before the scheduler gives up on it.
pub const DEFAULT_MAX_RERUNS_PER_NODE: usize = 100;

/// What happens when an internal invariant is found broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantPolicy {
    /// Log at error level, then panic.
    Assert,
    /// Log at error level and keep going.
    Warn,
}

impl Default for InvariantPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Assert
        } else {
            Self::Warn
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub max_reruns_per_node: usize,
    pub invariant_policy: InvariantPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_reruns_per_node: DEFAULT_MAX_RERUNS_PER_NODE,
            invariant_policy: InvariantPolicy::default(),
        }
    }
}

impl RuntimeConfig {
    /// Set the per-node rerun cap. Values below 1 are clamped to 1.
    pub fn with_max_reruns_per_node(mut self, limit: usize) -> Self {
        self.max_reruns_per_node = limit.max(1);
        self
    }

    pub fn with_invariant_policy(mut self, policy: InvariantPolicy) -> Self {
        self.invariant_policy = policy;
        self
    }
}
