use crate::error::FieldError;
use crate::polynomial::Polynomial;
use crate::types::{assert_same_field, FieldElement};

impl Polynomial {
    /// Polynomial long division.
    /// Returns `(q, r)`, the quotient and remainder of the division of `self` by `divisor`.
    pub fn div_rem(&self, divisor: &Self) -> Result<(Self, Self), FieldError> {
        assert_same_field(self.field(), divisor.field());
        let field = self.field();
        if divisor.is_zero() {
            return Err(FieldError::DivisionByZero);
        }
        if self.len() < divisor.len() {
            return Ok((Self::zero(field), self.clone()));
        }

        let divisor_leading_inv = divisor.leading_coefficient().inverse()?;
        let mut quotient = vec![field.zero(); self.len() - divisor.len() + 1];
        let mut remainder = self.coeffs().to_vec();
        for q_degree in (0..quotient.len()).rev() {
            let lead = &remainder[q_degree + divisor.len() - 1];
            if lead.is_zero() {
                continue;
            }
            let q_coeff = lead * &divisor_leading_inv;
            for (i, d) in divisor.coeffs().iter().enumerate() {
                remainder[q_degree + i] -= &q_coeff * d;
            }
            quotient[q_degree] = q_coeff;
        }
        remainder.truncate(divisor.len() - 1);
        Ok((Self::new(field, quotient), Self::new(field, remainder)))
    }

    /// Let `self=p(X)`, this returns `(p(X)-p(z))/(X-z)`.
    /// See <https://en.wikipedia.org/wiki/Horner%27s_method>
    pub fn divide_by_linear(&self, z: &FieldElement) -> Self {
        assert_same_field(self.field(), z.field());
        let mut bs = self
            .coeffs()
            .iter()
            .rev()
            .scan(self.field().zero(), |acc, c| {
                *acc = &*acc * z + c;
                Some(acc.clone())
            })
            .collect::<Vec<_>>();
        bs.pop();
        bs.reverse();
        Self::new(self.field(), bs)
    }

    /// Divides by `Z_H(X) = X^n - 1`, failing with [`FieldError::NotDivisible`] if the remainder
    /// is non-zero.
    pub fn divide_by_z_h(&self, n: usize) -> Result<Self, FieldError> {
        let field = self.field();
        if self.is_zero() {
            return Ok(self.clone());
        }
        if n == 0 || self.len() <= n {
            return Err(FieldError::NotDivisible);
        }

        // q_i = a_{i+n} + q_{i+n}, walking down from the top coefficient.
        let a = self.coeffs();
        let q_len = a.len() - n;
        let mut q = vec![field.zero(); q_len];
        for i in (0..q_len).rev() {
            q[i] = if i + n < q_len {
                &a[i + n] + &q[i + n]
            } else {
                a[i + n].clone()
            };
        }
        // Remainder: a_i + q_i for i < n.
        for i in 0..n {
            let q_i = q.get(i).cloned().unwrap_or_else(|| field.zero());
            if !(&a[i] + &q_i).is_zero() {
                return Err(FieldError::NotDivisible);
            }
        }
        Ok(Self::new(field, q))
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::types::PrimeField;

    fn babybear() -> PrimeField {
        PrimeField::new(2013265921u64).unwrap()
    }

    #[test]
    fn test_div_rem() {
        let field = babybear();
        let mut rng = ChaCha8Rng::seed_from_u64(20);
        for _ in 0..10 {
            let a_len = rng.gen_range(1..60);
            let b_len = rng.gen_range(1..60);
            let a = Polynomial::new(&field, field.rand_vec(a_len, &mut rng));
            let b = Polynomial::new(&field, field.rand_vec(b_len, &mut rng));
            if b.is_zero() {
                continue;
            }
            let (q, r) = a.div_rem(&b).unwrap();
            assert!(r.is_zero() || r.len() < b.len());
            assert_eq!(&(&q * &b) + &r, a);
        }
    }

    #[test]
    fn test_div_rem_by_zero() {
        let field = babybear();
        let a = Polynomial::from_u64s(&field, &[1, 2, 3]);
        assert_eq!(
            a.div_rem(&Polynomial::zero(&field)),
            Err(FieldError::DivisionByZero)
        );
    }

    #[test]
    fn test_division_by_linear() {
        let field = babybear();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let n = rng.gen_range(1..200);
        let poly = Polynomial::new(&field, field.rand_vec(n, &mut rng));
        let z = field.rand(&mut rng);
        let ev = poly.eval(&z);

        let quotient = poly.divide_by_linear(&z);
        let linear = Polynomial::new(&field, vec![-&z, field.one()]);
        assert_eq!(
            &(&quotient * &linear) + &Polynomial::constant(ev),
            poly
        );
    }

    #[test]
    fn test_divide_by_z_h() {
        let field = babybear();
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let n = 8;
        let mut z_h_coeffs = vec![field.zero(); n + 1];
        z_h_coeffs[0] = field.neg_one();
        z_h_coeffs[n] = field.one();
        let z_h = Polynomial::new(&field, z_h_coeffs);

        let q = Polynomial::new(&field, field.rand_vec(13, &mut rng));
        let product = &q * &z_h;
        assert_eq!(product.divide_by_z_h(n).unwrap(), q);

        let not_multiple = &product + &Polynomial::constant(field.one());
        assert_eq!(
            not_multiple.divide_by_z_h(n),
            Err(FieldError::NotDivisible)
        );
    }
}
