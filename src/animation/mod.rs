//! Animation - Values in the form animations interpolate.
//!
//! Interpolation itself lives outside this crate; here values are converted
//! to and from [`AnimatableVector`], a fixed-arity float vector.

pub mod vector;

pub use vector::{AnimatableVector, AnimatableVectorConvertible, VectorStorage};
