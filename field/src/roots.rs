//! Square and cube roots.

use num::{BigUint, Integer, Zero};

use crate::prime::inverse_mod;
use crate::types::FieldElement;

impl FieldElement {
    /// Euler's criterion. Zero counts as a residue.
    pub fn is_quadratic_residue(&self) -> bool {
        if self.is_zero() {
            return true;
        }
        let half_order = (self.field().modulus() - 1u32) >> 1;
        self.exp_biguint(&half_order).is_one()
    }

    /// A square root, or `None` for non-residues. Which of the two roots is returned is
    /// unspecified.
    pub fn sqrt(&self) -> Option<Self> {
        if self.is_zero() {
            return Some(self.clone());
        }
        if !self.is_quadratic_residue() {
            return None;
        }

        let field = self.field();
        let p = field.modulus();
        if (p % 4u32) == BigUint::from(3u32) {
            return Some(self.exp_biguint(&((p + 1u32) >> 2)));
        }

        // Tonelli–Shanks.
        let odd_part = field.odd_part();
        let mut m = field.two_adicity();
        let mut c = field.primitive_root_of_unity(m).ok()?;
        let mut t = self.exp_biguint(odd_part);
        let mut r = self.exp_biguint(&((odd_part + 1u32) >> 1));
        while !t.is_one() {
            let mut i = 0;
            let mut t_pow = t.clone();
            while !t_pow.is_one() {
                t_pow = t_pow.square();
                i += 1;
            }
            let b = c.exp_power_of_2(m - i - 1);
            m = i;
            c = b.square();
            t *= &c;
            r *= &b;
        }
        Some(r)
    }

    /// A cube root, or `None` when `self` is not a cube.
    pub fn cube_root(&self) -> Option<Self> {
        if self.is_zero() {
            return Some(self.clone());
        }

        let p = self.field().modulus();
        let p_minus_one = p - 1u32;
        if (p % 3u32) == BigUint::from(2u32) {
            // Cubing is a bijection; its inverse is `x^((2p - 1) / 3)`.
            return Some(self.exp_biguint(&((p * 2u32 - 1u32) / 3u32)));
        }
        if let Some(e) = inverse_mod(&BigUint::from(3u32), &p_minus_one) {
            return Some(self.exp_biguint(&e));
        }
        self.cube_root_adleman_manders_miller()
    }

    /// Cube roots when `3 | p - 1`, by recovering the discrete log of the defect in the 3-Sylow
    /// subgroup one base-3 digit at a time.
    fn cube_root_adleman_manders_miller(&self) -> Option<Self> {
        let field = self.field();
        let p_minus_one = field.modulus() - 1u32;
        let three = BigUint::from(3u32);
        if !self.exp_biguint(&(&p_minus_one / &three)).is_one() {
            return None;
        }

        // p - 1 = 3^s * t with 3 ∤ t.
        let mut s = 0u32;
        let mut t = p_minus_one.clone();
        while (&t % &three).is_zero() {
            t /= &three;
            s += 1;
        }

        let non_cube = (2u64..)
            .map(|c| field.from_u64(c))
            .take(1 << 16)
            .find(|c| !c.exp_biguint(&(&p_minus_one / &three)).is_one())?;
        let z = non_cube.exp_biguint(&t);
        let z_inv = z.inverse().ok()?;
        let omega = z.exp_biguint(&three.pow(s - 1));
        let omega_sq = omega.square();

        let e = inverse_mod(&three, &t).unwrap_or_else(BigUint::zero);
        let y = self.exp_biguint(&e);
        let defect = y.exp_u64(3) * self.inverse().ok()?;

        let mut k = BigUint::zero();
        for i in 0..s {
            let h = (&defect * z_inv.exp_biguint(&k)).exp_biguint(&three.pow(s - 1 - i));
            let digit = if h.is_one() {
                0u32
            } else if h == omega {
                1
            } else if h == omega_sq {
                2
            } else {
                return None;
            };
            k += three.pow(i) * digit;
        }

        let (k_third, rem) = k.div_rem(&three);
        if !rem.is_zero() {
            return None;
        }
        Some(y * z_inv.exp_biguint(&k_third))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::types::PrimeField;

    fn fields() -> Vec<PrimeField> {
        // 17 ≡ 1 (mod 4), 2 (mod 3); 2013265921 ≡ 1 (mod 4), 1 (mod 3);
        // 2^61 - 1 ≡ 3 (mod 4), 1 (mod 3); 103 ≡ 3 (mod 4), 1 (mod 3).
        [17u64, 103, 2013265921, 2305843009213693951]
            .into_iter()
            .map(|p| PrimeField::new(p).unwrap())
            .collect()
    }

    #[test]
    fn square_roots() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for field in fields() {
            for _ in 0..30 {
                let x = field.rand(&mut rng);
                let square = x.square();
                assert!(square.is_quadratic_residue());
                let root = square.sqrt().unwrap();
                assert_eq!(root.square(), square);
            }
            let nonresidue = field.nonresidue();
            assert!(!nonresidue.is_quadratic_residue());
            assert_eq!(nonresidue.sqrt(), None);
            assert_eq!(field.zero().sqrt(), Some(field.zero()));
        }
    }

    #[test]
    fn cube_roots() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for field in fields() {
            for _ in 0..30 {
                let x = field.rand(&mut rng);
                let cube = x.exp_u64(3);
                let root = cube.cube_root().unwrap();
                assert_eq!(root.exp_u64(3), cube);
            }
        }
    }

    #[test]
    fn non_cubes_have_no_cube_root() {
        // A generator of the full group is never a cube when 3 divides p - 1.
        let field = PrimeField::new(2013265921u64).unwrap();
        let generator = field.multiplicative_generator().unwrap();
        assert_eq!(generator.cube_root(), None);
    }
}
