use crate::batch_util::batch_multiplicative_inverse;
use crate::error::FieldError;
use crate::types::{FieldElement, PrimeField};

/// Precomputations of the evaluation of `Z_H(X) = X^n - 1` on a coset `gK` with `H <= K`.
#[derive(Clone, Debug)]
pub struct ZeroPolyOnCoset {
    /// `rate = |K|/|H|`.
    rate: usize,
    /// Holds `g^n * (w^n)^i - 1 = g^n * v^i - 1` for `i in 0..rate`, with `w` a generator of `K`
    /// and `v` a `rate`-primitive root of unity.
    evals: Vec<FieldElement>,
    /// Holds the multiplicative inverses of `evals`.
    inverses: Vec<FieldElement>,
}

impl ZeroPolyOnCoset {
    /// Fails with [`FieldError::DivisionByZero`] when `g^n` lies in the subgroup of order `rate`,
    /// i.e. when the coset meets `H`.
    pub fn new(
        field: &PrimeField,
        shift: &FieldElement,
        n_log: usize,
        rate_bits: usize,
    ) -> Result<Self, FieldError> {
        let g_pow_n = shift.exp_power_of_2(n_log);
        let evals = field
            .two_adic_subgroup(rate_bits)?
            .into_iter()
            .map(|x| &g_pow_n * x - field.one())
            .collect::<Vec<_>>();
        let inverses = batch_multiplicative_inverse(&evals)?;
        Ok(Self {
            rate: 1 << rate_bits,
            evals,
            inverses,
        })
    }

    /// Returns `Z_H(g * w^i)`.
    pub fn eval(&self, i: usize) -> &FieldElement {
        &self.evals[i % self.rate]
    }

    /// Returns `1 / Z_H(g * w^i)`.
    pub fn eval_inverse(&self, i: usize) -> &FieldElement {
        &self.inverses[i % self.rate]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_direct_evaluation() {
        let field = PrimeField::new(2013265921u64).unwrap();
        let (n_log, rate_bits) = (4, 2);
        let shift = field.coset_shift();
        let z = ZeroPolyOnCoset::new(&field, &shift, n_log, rate_bits).unwrap();
        let coset = field.two_adic_coset(&shift, n_log + rate_bits).unwrap();
        for (i, x) in coset.iter().enumerate() {
            let direct = x.exp_power_of_2(n_log) - field.one();
            assert_eq!(*z.eval(i), direct);
            assert_eq!(z.eval_inverse(i) * &direct, field.one());
        }
    }

    #[test]
    fn coset_meeting_subgroup_fails() {
        let field = PrimeField::new(2013265921u64).unwrap();
        assert_eq!(
            ZeroPolyOnCoset::new(&field, &field.one(), 4, 2).map(|_| ()),
            Err(FieldError::DivisionByZero)
        );
    }
}
