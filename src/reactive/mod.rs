//! Reactive - Fine-grained observation of state.
//!
//! - Registrar: access / will_set / did_set notifications per state owner
//! - Tracking: sessions that record reads and fire once on the next write
//! - State: observable cells and per-component slot storage
//! - Binding: non-owning two-way handles to a cell
//! - Effect: function nodes that rerun side effects
//!
//! Reads are tracked only while a session is recording; writes always notify.

pub mod registrar;
pub mod tracking;
mod state;
mod binding;
mod effect;

pub use registrar::{PropertyId, PropertyKey, Registrar, RegistrarId};
pub use tracking::{SessionId, SessionStatus, TrackingSession};
pub use state::{StateCell, ViewStateStorage};
pub use binding::Binding;
pub use effect::EffectHandle;
