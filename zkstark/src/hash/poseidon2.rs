//! Poseidon2: the Poseidon round structure with cheaper linear layers.
//!
//! Full rounds use an external matrix built from 4x4 blocks (a small circulant for widths up to
//! 3), partial rounds use the internal matrix `1 + diag(mu)`, and an extra external layer is
//! applied before the first round.

use anyhow::{ensure, Result};
use zkstark_field::{FieldElement, PrimeField};

use crate::hash::grain::GrainLfsr;
use crate::hash::hashing::{AlgebraicHasher, SpongePermutation};
use crate::hash::poseidon::{cauchy_mds, mat_vec_mul};
use crate::hash::poseidon_params::PoseidonParameters;

const M4: [[u64; 4]; 4] = [[5, 7, 1, 3], [4, 6, 1, 1], [1, 3, 5, 7], [1, 1, 4, 6]];

fn external_matrix(field: &PrimeField, width: usize) -> Result<Vec<Vec<FieldElement>>> {
    if width <= 3 {
        // circ(2, 1, ..., 1)
        return Ok((0..width)
            .map(|i| {
                (0..width)
                    .map(|j| field.from_u64(if i == j { 2 } else { 1 }))
                    .collect()
            })
            .collect());
    }
    if width % 4 == 0 {
        // circ(2 * M4, M4, ..., M4)
        return Ok((0..width)
            .map(|i| {
                (0..width)
                    .map(|j| {
                        let entry = M4[i % 4][j % 4];
                        field.from_u64(if i / 4 == j / 4 { 2 * entry } else { entry })
                    })
                    .collect()
            })
            .collect());
    }
    cauchy_mds(field, width)
}

#[derive(Clone, Debug)]
pub struct Poseidon2 {
    field: PrimeField,
    params: PoseidonParameters,
    round_constants: Vec<Vec<FieldElement>>,
    external: Vec<Vec<FieldElement>>,
    /// Diagonal of the internal matrix minus the all-ones matrix.
    internal_diag: Vec<FieldElement>,
}

impl Poseidon2 {
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
        let internal_diag = (0..params.width)
            .map(|_| loop {
                let mu = grain.next_field_element(field);
                if !mu.is_zero() && !mu.is_one() {
                    break mu;
                }
            })
            .collect::<Vec<_>>();
        let external = external_matrix(field, params.width)?;
        ensure!(
            external.len() == params.width && internal_diag.len() == params.width,
            "Poseidon2 linear layers do not match the state width."
        );
        Ok(Self {
            field: field.clone(),
            params,
            round_constants,
            external,
            internal_diag,
        })
    }

    pub fn params(&self) -> &PoseidonParameters {
        &self.params
    }

    fn sbox(&self, x: &FieldElement) -> FieldElement {
        x.exp_u64(self.params.alpha)
    }

    fn external_layer(&self, state: &mut [FieldElement]) {
        let mixed = mat_vec_mul(&self.field, &self.external, state);
        state.clone_from_slice(&mixed);
    }

    /// `y_i = sum(x) + mu_i * x_i`.
    fn internal_layer(&self, state: &mut [FieldElement]) {
        let sum = state.iter().fold(self.field.zero(), |acc, x| acc + x);
        for (s, mu) in state.iter_mut().zip(&self.internal_diag) {
            *s = &sum + mu * &*s;
        }
    }

    fn full_round(&self, state: &mut [FieldElement], round: usize) {
        for (s, c) in state.iter_mut().zip(&self.round_constants[round]) {
            *s = self.sbox(&(&*s + c));
        }
        self.external_layer(state);
    }

    fn partial_round(&self, state: &mut [FieldElement], round: usize) {
        state[0] = self.sbox(&(&state[0] + &self.round_constants[round][0]));
        self.internal_layer(state);
    }
}

impl SpongePermutation for Poseidon2 {
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
        assert_eq!(state.len(), self.params.width, "wrong Poseidon2 state width");
        self.external_layer(state);
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

/// The `algebraic-sponge-variant-2` hasher.
pub type Poseidon2Hash = AlgebraicHasher<Poseidon2>;

impl Poseidon2Hash {
    pub fn poseidon2(field: &PrimeField, security_bits: usize) -> Result<Self> {
        Ok(AlgebraicHasher::new(
            "poseidon2",
            Poseidon2::new(field, security_bits)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hashing::Hasher;
    use crate::hash::poseidon::PoseidonHash;

    fn babybear() -> PrimeField {
        PrimeField::new(2013265921u64).unwrap()
    }

    #[test]
    fn external_matrix_shapes() -> Result<()> {
        let field = babybear();
        let m3 = external_matrix(&field, 3)?;
        assert_eq!(m3[0], vec![field.from_u64(2), field.one(), field.one()]);

        let m8 = external_matrix(&field, 8)?;
        assert_eq!(m8[0][0], field.from_u64(10));
        assert_eq!(m8[0][4], field.from_u64(5));
        assert_eq!(m8[5][1], field.from_u64(6));
        assert_eq!(m8[5][5], field.from_u64(12));
        Ok(())
    }

    #[test]
    fn permutation_is_deterministic() -> Result<()> {
        let field = babybear();
        let perm = Poseidon2::new(&field, 128)?;
        assert_eq!(perm.width(), 16);
        let mut a = (0..16).map(|i| field.from_u64(i)).collect::<Vec<_>>();
        let mut b = a.clone();
        perm.permute(&mut a);
        perm.permute(&mut b);
        assert_eq!(a, b);
        assert_ne!(a, (0..16).map(|i| field.from_u64(i)).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn differs_from_poseidon() -> Result<()> {
        let field = babybear();
        let p1 = PoseidonHash::poseidon(&field, 80)?;
        let p2 = Poseidon2Hash::poseidon2(&field, 80)?;
        let inputs = vec![field.from_u64(1), field.from_u64(2)];
        assert_ne!(p1.hash_elements(&inputs), p2.hash_elements(&inputs));
        assert_eq!(p2.hash(&[]), field.zero());
        assert_eq!(p2.name(), "poseidon2");
        Ok(())
    }
}
