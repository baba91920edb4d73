//! Numeric coordinate types usable inside a [`crate::geometry::Point`].

use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Sub};

/// A totally-ordered numeric coordinate type.
///
/// `do_util`'s `CartesianParetoElement` fixed its coordinate type to `u16`;
/// here the coordinate type is a crate-local trait so both integer and
/// floating-point coordinates work the same way through the rest of the
/// crate (geometry, indexes, fronts, archives).
pub trait Scalar:
    Copy + PartialOrd + PartialEq + Debug + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self>
{
    /// the additive identity
    fn zero() -> Self;
    /// converts to `f64` for distance/volume computations, which are always
    /// performed in floating point regardless of coordinate type
    fn to_f64(self) -> f64;
    /// converts a `f64` back into this coordinate type (used by the
    /// Monte-Carlo hypervolume sampler and by reference-point construction)
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_scalar_float {
    ($t:ty) => {
        impl Scalar for $t {
            fn zero() -> Self {
                0.0
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

macro_rules! impl_scalar_int {
    ($t:ty) => {
        impl Scalar for $t {
            fn zero() -> Self {
                0
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

impl_scalar_float!(f32);
impl_scalar_float!(f64);
impl_scalar_int!(i32);
impl_scalar_int!(i64);
impl_scalar_int!(u16);
impl_scalar_int!(u32);
