//! State Module - Interaction state bound to mounted elements
//!
//! - **Focus** - Focus states, bindings, and the focus modifier
//! - **Input** - Two-way value binding for input elements

pub mod focus;
pub mod input;

pub use focus::{
    FocusBinding, FocusModifier, FocusState, FocusStateStorage, FocusValue, Focusable,
    FocusableId,
};
pub use input::ValueModifier;
