//! FRI: a proof that a committed function on a two-adic coset is close to a polynomial of low
//! degree.
//!
//! Each round commits to the current layer, draws a folding challenge `beta` and halves the
//! domain with `f'(x^2) = (f(x) + f(-x)) / 2 + beta * (f(x) - f(-x)) / (2x)`. Folding stops at a
//! single value, which is sent in the clear.

use anyhow::{ensure, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use zkstark_field::{FieldElement, PrimeField};

use crate::iop::channel::Channel;

pub mod proof;
pub mod prover;
pub mod verifier;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FriConfig {
    /// `rate = 2^{-rate_bits}`.
    pub rate_bits: usize,

    /// Number of query rounds to perform.
    pub num_query_rounds: usize,
}

impl FriConfig {
    pub fn rate(&self) -> f64 {
        1.0 / ((1 << self.rate_bits) as f64)
    }

    /// The blow-up factor `1 / rate`.
    pub fn blowup(&self) -> usize {
        1 << self.rate_bits
    }

    /// Conjectured bits of security from the queries alone.
    pub fn conjectured_security_bits(&self) -> usize {
        self.num_query_rounds * self.rate_bits
    }
}

/// The evaluation domains of every layer: `shift * <h>` with `h` of order `2^lg_size`, followed by
/// the images under squaring down to a single point. Point `i + n/2` of a layer of size `n` is
/// the negation of point `i`.
pub fn fri_domains(
    field: &PrimeField,
    shift: &FieldElement,
    lg_size: usize,
) -> Result<Vec<Vec<FieldElement>>> {
    let mut domains = vec![field.two_adic_coset(shift, lg_size)?];
    while let Some(last) = domains.last().filter(|d| d.len() > 1) {
        let next = last[..last.len() / 2]
            .iter()
            .map(|x| x.square())
            .collect_vec();
        domains.push(next);
    }
    Ok(domains)
}

/// Folds the pair `(f(x), f(-x))`, given `1/2` and `1/(2x)`.
pub(crate) fn fold_pair(
    f_x: &FieldElement,
    f_neg_x: &FieldElement,
    beta: &FieldElement,
    two_inv: &FieldElement,
    two_x_inv: &FieldElement,
) -> FieldElement {
    (f_x + f_neg_x) * two_inv + beta * (f_x - f_neg_x) * two_x_inv
}

/// Draws the query positions, each in `[0, domain_size)`.
pub fn draw_query_indices(
    channel: &mut Channel,
    num_queries: usize,
    domain_size: usize,
) -> Result<Vec<usize>> {
    ensure!(domain_size > 0, "Cannot query an empty domain.");
    (0..num_queries)
        .map(|_| {
            channel
                .receive_random_int(0, domain_size as u64 - 1)
                .map(|i| i as usize)
        })
        .collect()
}
