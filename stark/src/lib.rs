//! A STARK prover and verifier for boundary and transition constraints over a single-column
//! trace, built on the FRI low-degree test of the `zkstark` crate.

#![allow(clippy::needless_range_loop)]
#![allow(clippy::type_complexity)]

pub mod config;
pub mod constraint_consumer;
mod get_challenges;
pub mod proof;
pub mod prover;
pub mod square_fibonacci_stark;
pub mod stark;
mod vanishing_poly;
pub mod verifier;
