//! The Poseidon permutation over a runtime prime field.
//!
//! Each round adds round constants, applies the S-box `x^alpha` (to the whole state in full
//! rounds, to the first element in partial rounds) and multiplies by a Cauchy MDS matrix. Half the
//! full rounds come first, then the partial rounds, then the other half.

use anyhow::Result;
use zkstark_field::batch_util::batch_multiplicative_inverse;
use zkstark_field::{FieldElement, PrimeField};

use crate::hash::grain::GrainLfsr;
use crate::hash::hashing::{AlgebraicHasher, SpongePermutation};
use crate::hash::poseidon_params::PoseidonParameters;

/// The Cauchy matrix `M[i][j] = 1 / (x_i + y_j)` with `x_i = i` and `y_j = t + j`, which is MDS
/// as long as no `i + t + j` vanishes modulo `p`.
pub(crate) fn cauchy_mds(field: &PrimeField, width: usize) -> Result<Vec<Vec<FieldElement>>> {
    let denominators = (0..width)
        .flat_map(|i| (0..width).map(move |j| field.from_usize(i + width + j)))
        .collect::<Vec<_>>();
    let entries = batch_multiplicative_inverse(&denominators)?;
    Ok(entries.chunks(width).map(|row| row.to_vec()).collect())
}

/// `matrix * state`.
pub(crate) fn mat_vec_mul(
    field: &PrimeField,
    matrix: &[Vec<FieldElement>],
    state: &[FieldElement],
) -> Vec<FieldElement> {
    matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(state)
                .fold(field.zero(), |acc, (m, s)| acc + m * s)
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct Poseidon {
    field: PrimeField,
    params: PoseidonParameters,
    /// One row of `width` constants per round.
    round_constants: Vec<Vec<FieldElement>>,
    mds: Vec<Vec<FieldElement>>,
}

impl Poseidon {
    pub fn new(field: &PrimeField, security_bits: usize) -> Result<Self> {
        let params = PoseidonParameters::new(field, security_bits)?;
        Self::with_parameters(field, params)
    }

    pub fn with_parameters(field: &PrimeField, params: PoseidonParameters) -> Result<Self> {
        let mut grain = GrainLfsr::new(
            params.alpha,
            params.field_bits,
            params.width,
            params.full_rounds,
            params.partial_rounds,
        );
        let round_constants = (0..params.num_rounds())
            .map(|_| grain.next_field_elements(field, params.width))
            .collect();
        let mds = cauchy_mds(field, params.width)?;
        Ok(Self {
            field: field.clone(),
            params,
            round_constants,
            mds,
        })
    }

    pub fn params(&self) -> &PoseidonParameters {
        &self.params
    }

    pub fn round_constants(&self) -> &[Vec<FieldElement>] {
        &self.round_constants
    }

    pub fn mds(&self) -> &[Vec<FieldElement>] {
        &self.mds
    }

    fn sbox(&self, x: &FieldElement) -> FieldElement {
        x.exp_u64(self.params.alpha)
    }

    fn full_round(&self, state: &mut [FieldElement], round: usize) {
        for (s, c) in state.iter_mut().zip(&self.round_constants[round]) {
            *s = self.sbox(&(&*s + c));
        }
        let mixed = mat_vec_mul(&self.field, &self.mds, state);
        state.clone_from_slice(&mixed);
    }

    fn partial_round(&self, state: &mut [FieldElement], round: usize) {
        for (s, c) in state.iter_mut().zip(&self.round_constants[round]) {
            *s += c;
        }
        state[0] = self.sbox(&state[0]);
        let mixed = mat_vec_mul(&self.field, &self.mds, state);
        state.clone_from_slice(&mixed);
    }
}

impl SpongePermutation for Poseidon {
    fn field(&self) -> &PrimeField {
        &self.field
    }

    fn width(&self) -> usize {
        self.params.width
    }

    fn rate(&self) -> usize {
        self.params.rate
    }

    fn permute(&self, state: &mut [FieldElement]) {
        assert_eq!(state.len(), self.params.width, "wrong Poseidon state width");
        let half_full = self.params.full_rounds / 2;
        let mut round = 0;
        for _ in 0..half_full {
            self.full_round(state, round);
            round += 1;
        }
        for _ in 0..self.params.partial_rounds {
            self.partial_round(state, round);
            round += 1;
        }
        for _ in 0..half_full {
            self.full_round(state, round);
            round += 1;
        }
    }
}

/// The `algebraic-sponge-variant-1` hasher.
pub type PoseidonHash = AlgebraicHasher<Poseidon>;

impl PoseidonHash {
    pub fn poseidon(field: &PrimeField, security_bits: usize) -> Result<Self> {
        Ok(AlgebraicHasher::new("poseidon", Poseidon::new(field, security_bits)?))
    }
}
