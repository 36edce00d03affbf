//! Poseidon instance parameters, derived from the security level and the field size.

use anyhow::{anyhow, ensure, Result};
use num::{BigUint, Integer, One};
use zkstark_field::PrimeField;

/// Tabulated security levels in bits. A request is served by the smallest level at least as large.
pub const SECURITY_LEVELS: [usize; 4] = [80, 128, 192, 256];

/// Upper bounds of the field-size columns, in bits; the last column takes every larger field.
const FIELD_BITS_COLUMNS: [usize; 3] = [32, 64, 128];

/// `(width, rate, full rounds, partial rounds)` per security level (rows) and field size
/// (columns: up to 32, 64, 128 bits, then larger).
const PARAMETER_TABLE: [[(usize, usize, usize, usize); 4]; 4] = [
    [(8, 4, 8, 22), (4, 2, 8, 30), (3, 2, 8, 33), (3, 2, 8, 35)],
    [(16, 8, 8, 31), (12, 8, 8, 42), (4, 2, 8, 54), (3, 2, 8, 57)],
    [(16, 8, 8, 44), (16, 8, 8, 60), (8, 4, 8, 70), (4, 2, 8, 80)],
    [(16, 8, 8, 56), (16, 8, 8, 78), (12, 8, 8, 90), (4, 2, 8, 100)],
];

/// S-box exponents tried in order; the first one coprime to `p - 1` is used.
const ALPHA_CANDIDATES: [u64; 8] = [3, 5, 7, 11, 13, 17, 19, 23];

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoseidonParameters {
    /// The tabulated security level in bits.
    pub security_level: usize,
    pub field_bits: usize,
    /// State width `t`.
    pub width: usize,
    pub rate: usize,
    pub full_rounds: usize,
    pub partial_rounds: usize,
    /// S-box exponent.
    pub alpha: u64,
}

impl PoseidonParameters {
    pub fn new(field: &PrimeField, security_bits: usize) -> Result<Self> {
        let row = SECURITY_LEVELS
            .iter()
            .position(|&level| level >= security_bits)
            .ok_or_else(|| {
                anyhow!(
                    "No Poseidon parameters for {} bits of security; the maximum is {}.",
                    security_bits,
                    SECURITY_LEVELS[SECURITY_LEVELS.len() - 1]
                )
            })?;
        let field_bits = field.bits();
        let column = FIELD_BITS_COLUMNS
            .iter()
            .position(|&max_bits| field_bits <= max_bits)
            .unwrap_or(FIELD_BITS_COLUMNS.len());
        let (width, rate, full_rounds, partial_rounds) = PARAMETER_TABLE[row][column];

        let p_minus_one = field.modulus() - 1u32;
        let alpha = ALPHA_CANDIDATES
            .iter()
            .copied()
            .find(|&a| BigUint::from(a).gcd(&p_minus_one).is_one())
            .ok_or_else(|| anyhow!("No S-box exponent is a permutation of {}.", field))?;

        let params = Self {
            security_level: SECURITY_LEVELS[row],
            field_bits,
            width,
            rate,
            full_rounds,
            partial_rounds,
            alpha,
        };
        ensure!(params.rate < params.width, "Rate must leave a capacity.");
        ensure!(params.full_rounds % 2 == 0, "Full rounds must split evenly.");
        Ok(params)
    }

    pub fn capacity(&self) -> usize {
        self.width - self.rate
    }

    pub fn num_rounds(&self) -> usize {
        self.full_rounds + self.partial_rounds
    }
}
