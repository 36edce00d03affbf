#![allow(clippy::len_without_is_empty)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::return_self_not_must_use)]

pub mod batch_util;
pub mod error;
pub mod fft;
pub mod interpolation;
mod ops;
pub mod polynomial;
pub mod prime;
mod roots;
pub mod types;
pub mod zero_poly_coset;

pub use error::FieldError;
pub use types::{FieldElement, PrimeField};
