//! Animatable vectors and conversions for built-in numeric types.
//!
//! | Type | Storage |
//! |---|---|
//! | `f32`, `f64` | `D1` |
//! | `[f32; 2]`, `[f64; 2]` | `D2` |
//! | `[f32; 4]`, `[f64; 4]` | `D4` |
//! | `[f32; 8]`, `[f64; 8]` | `D8` |
//!
//! `f64` values are stored as `f32`.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VectorStorage {
    D1(f32),
    D2([f32; 2]),
    D4([f32; 4]),
    D8([f32; 8]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatableVector {
    storage: VectorStorage,
}

impl AnimatableVector {
    pub fn new(storage: VectorStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &VectorStorage {
        &self.storage
    }

    /// Number of components: 1, 2, 4 or 8.
    pub fn arity(&self) -> usize {
        self.as_slice().len()
    }

    pub fn as_slice(&self) -> &[f32] {
        match &self.storage {
            VectorStorage::D1(value) => std::slice::from_ref(value),
            VectorStorage::D2(values) => values.as_slice(),
            VectorStorage::D4(values) => values.as_slice(),
            VectorStorage::D8(values) => values.as_slice(),
        }
    }
}

impl From<VectorStorage> for AnimatableVector {
    fn from(storage: VectorStorage) -> Self {
        Self::new(storage)
    }
}

pub trait AnimatableVectorConvertible: Sized {
    fn animatable_vector(&self) -> AnimatableVector;

    /// Fails with [`Error::VectorArity`] when `vector` has a different arity.
    fn from_animatable_vector(vector: &AnimatableVector) -> Result<Self>;
}

fn arity_error(expected: usize, vector: &AnimatableVector) -> Error {
    Error::VectorArity {
        expected,
        found: vector.arity(),
    }
}

impl AnimatableVectorConvertible for f32 {
    fn animatable_vector(&self) -> AnimatableVector {
        VectorStorage::D1(*self).into()
    }

    fn from_animatable_vector(vector: &AnimatableVector) -> Result<Self> {
        match vector.storage {
            VectorStorage::D1(value) => Ok(value),
            _ => Err(arity_error(1, vector)),
        }
    }
}

impl AnimatableVectorConvertible for f64 {
    fn animatable_vector(&self) -> AnimatableVector {
        (*self as f32).animatable_vector()
    }

    fn from_animatable_vector(vector: &AnimatableVector) -> Result<Self> {
        f32::from_animatable_vector(vector).map(f64::from)
    }
}

macro_rules! array_vectors {
    ($($n:literal => $variant:ident),+ $(,)?) => {$(
        impl AnimatableVectorConvertible for [f32; $n] {
            fn animatable_vector(&self) -> AnimatableVector {
                VectorStorage::$variant(*self).into()
            }

            fn from_animatable_vector(vector: &AnimatableVector) -> Result<Self> {
                match vector.storage {
                    VectorStorage::$variant(values) => Ok(values),
                    _ => Err(arity_error($n, vector)),
                }
            }
        }

        impl AnimatableVectorConvertible for [f64; $n] {
            fn animatable_vector(&self) -> AnimatableVector {
                self.map(|value| value as f32).animatable_vector()
            }

            fn from_animatable_vector(vector: &AnimatableVector) -> Result<Self> {
                <[f32; $n]>::from_animatable_vector(vector).map(|values| values.map(f64::from))
            }
        }
    )+};
}

array_vectors!(2 => D2, 4 => D4, 8 => D8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversion() {
        let vector = 0.5f32.animatable_vector();
        assert_eq!(vector.storage(), &VectorStorage::D1(0.5));
        assert_eq!(f32::from_animatable_vector(&vector).unwrap(), 0.5);
    }

    #[test]
    fn test_f64_goes_through_f32() {
        let vector = 0.1f64.animatable_vector();
        let back = f64::from_animatable_vector(&vector).unwrap();
        assert_eq!(back, f64::from(0.1f32));
    }

    #[test]
    fn test_array_arity() {
        assert_eq!([1.0f32, 2.0].animatable_vector().arity(), 2);
        assert_eq!([0.0f64; 4].animatable_vector().arity(), 4);
        assert_eq!([0.0f32; 8].animatable_vector().as_slice(), &[0.0; 8]);
    }

    #[test]
    fn test_mismatched_arity_is_an_error() {
        let vector = [1.0f32, 2.0, 3.0, 4.0].animatable_vector();

        let error = <[f32; 2]>::from_animatable_vector(&vector).unwrap_err();
        assert!(matches!(error, Error::VectorArity { expected: 2, found: 4 }));

        let error = f64::from_animatable_vector(&vector).unwrap_err();
        assert!(matches!(error, Error::VectorArity { expected: 1, found: 4 }));
    }
}
