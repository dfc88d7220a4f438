//! Usage errors and invariant violations.
//!
//! Usage errors are recoverable programmer mistakes: they log a warning and the
//! offending operation is ignored. Invariant violations mean the core itself is
//! in a state it should never reach; they log at error level and, under
//! [`InvariantPolicy::Assert`], panic.

use std::fmt;

use crate::config::InvariantPolicy;
use crate::engine::Runtime;

pub(crate) fn usage_error(message: fmt::Arguments<'_>) {
    tracing::warn!("{message}");
}

pub(crate) fn invariant_violation(runtime: Option<&Runtime>, message: fmt::Arguments<'_>) {
    let policy = runtime
        .map(|rt| rt.config().invariant_policy)
        .unwrap_or_default();
    tracing::error!("invariant violated: {message}");
    if policy == InvariantPolicy::Assert {
        panic!("invariant violated: {message}");
    }
}
