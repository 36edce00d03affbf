use num::BigUint;
use thiserror::Error;

/// Recoverable arithmetic and domain errors.
///
/// Operand field mismatches are not represented here: mixing elements of different fields is a
/// bug in the caller and panics.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum FieldError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("modulus {0} is not an odd prime")]
    InvalidModulus(BigUint),

    #[error("size {0} is not a power of two")]
    NotPowerOfTwo(usize),

    #[error("field has no primitive root of unity of order 2^{0}")]
    NoRootOfUnity(usize),

    #[error("duplicate x-coordinate in interpolation points")]
    DuplicatePoint,

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("polynomial is not divisible by the given divisor")]
    NotDivisible,
}
