use zkstark_util::{is_power_of_two, log2_strict, reverse_index_bits_in_place};

use crate::error::FieldError;
use crate::polynomial::{Polynomial, PolynomialValues};
use crate::types::{FieldElement, PrimeField};

/// Powers `ω^0, ..., ω^(n/2 - 1)` of a primitive `n`-th root of unity `ω`.
pub type FftRootTable = Vec<FieldElement>;

pub fn fft_root_table(field: &PrimeField, n: usize) -> Result<FftRootTable, FieldError> {
    if !is_power_of_two(n) {
        return Err(FieldError::NotPowerOfTwo(n));
    }
    let lg_n = log2_strict(n);
    let base = field.primitive_root_of_unity(lg_n)?;
    Ok(base.powers().take((n / 2).max(1)).collect())
}

fn check_root_table(root_table: &FftRootTable, n: usize) -> Result<(), FieldError> {
    let expected = (n / 2).max(1);
    if root_table.len() != expected {
        return Err(FieldError::LengthMismatch {
            expected,
            actual: root_table.len(),
        });
    }
    Ok(())
}

/// Radix-2 Cooley–Tukey, decimation in time: bit-reversal permutation followed by `log2(n)`
/// butterfly stages. On return `values[i] = Σ_j input[j] * ω^(i*j)`.
fn fft_in_place(values: &mut [FieldElement], root_table: &FftRootTable) {
    let n = values.len();
    if n <= 1 {
        return;
    }
    reverse_index_bits_in_place(values);

    let mut half_m = 1;
    while half_m < n {
        let m = half_m * 2;
        // The twiddle for butterfly j in a block of size m is ω^(j * n/m).
        let stride = n / m;
        for block in values.chunks_mut(m) {
            let (lo, hi) = block.split_at_mut(half_m);
            for (j, (u, v)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
                let t = &*v * &root_table[j * stride];
                let u_old = u.clone();
                *u = &u_old + &t;
                *v = u_old - t;
            }
        }
        half_m = m;
    }
}

/// Evaluates the polynomial with the given coefficients on the two-adic subgroup of order
/// `coeffs.len()`, which must be a power of two.
pub fn fft_with_options(
    field: &PrimeField,
    coeffs: Vec<FieldElement>,
    root_table: Option<&FftRootTable>,
) -> Result<PolynomialValues, FieldError> {
    let n = coeffs.len();
    if !is_power_of_two(n) {
        return Err(FieldError::NotPowerOfTwo(n));
    }
    let mut buffer = coeffs;
    match root_table {
        Some(table) => {
            check_root_table(table, n)?;
            fft_in_place(&mut buffer, table);
        }
        None => fft_in_place(&mut buffer, &fft_root_table(field, n)?),
    }
    Ok(PolynomialValues::new(field, buffer))
}

/// Evaluates `poly` on the two-adic subgroup of order `n`.
pub fn fft(poly: &Polynomial, n: usize) -> Result<PolynomialValues, FieldError> {
    poly.fft(n)
}

/// Interpolates values on the two-adic subgroup of order `values.len()`. The result is the raw,
/// untrimmed coefficient vector of length `n`.
pub fn ifft_with_options(
    field: &PrimeField,
    values: Vec<FieldElement>,
    root_table: Option<&FftRootTable>,
) -> Result<Vec<FieldElement>, FieldError> {
    let n = values.len();
    let mut buffer = fft_with_options(field, values, root_table)?.values;

    // The forward transform evaluated at ω^-i lands at index n - i; undo that and divide by n.
    let n_inv = field.from_usize(n).inverse()?;
    buffer[0] *= &n_inv;
    if n > 1 {
        buffer[n / 2] *= &n_inv;
    }
    for i in 1..(n / 2) {
        let j = n - i;
        let coeffs_i = &buffer[j] * &n_inv;
        let coeffs_j = &buffer[i] * &n_inv;
        buffer[i] = coeffs_i;
        buffer[j] = coeffs_j;
    }
    Ok(buffer)
}

pub fn ifft(values: PolynomialValues) -> Result<Polynomial, FieldError> {
    values.ifft()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn evaluate_naive(poly: &Polynomial, n: usize) -> Vec<FieldElement> {
        let field = poly.field();
        let subgroup = field.two_adic_subgroup(log2_strict(n)).unwrap();
        subgroup.iter().map(|x| poly.eval(x)).collect()
    }

    #[test]
    fn fft_and_ifft() {
        let field = PrimeField::new(2013265921u64).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for degree in [0usize, 1, 5, 17, 100] {
            let poly = Polynomial::new(&field, field.rand_vec(degree + 1, &mut rng));
            let n = (degree + 1).next_power_of_two() * 2;

            let values = fft(&poly, n).unwrap();
            assert_eq!(values.values, evaluate_naive(&poly, n));
            assert_eq!(ifft(values).unwrap(), poly);
        }
    }

    #[test]
    fn ifft_of_fft_is_identity_on_raw_vectors() {
        let field = PrimeField::new(18446744069414584321u64).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        for lg_n in 0..8 {
            let v = field.rand_vec(1 << lg_n, &mut rng);
            let table = fft_root_table(&field, 1 << lg_n).unwrap();
            let values = fft_with_options(&field, v.clone(), Some(&table)).unwrap();
            let back = ifft_with_options(&field, values.values, Some(&table)).unwrap();
            assert_eq!(back, v);
        }
    }

    #[test]
    fn rejects_bad_sizes() {
        let field = PrimeField::new(2013265921u64).unwrap();
        assert_eq!(
            fft_with_options(&field, field.rand_vec(6, &mut ChaCha8Rng::seed_from_u64(0)), None),
            Err(FieldError::NotPowerOfTwo(6))
        );
        // BabyBear has two-adicity 27.
        assert_eq!(
            fft_root_table(&field, 1 << 28),
            Err(FieldError::NoRootOfUnity(28))
        );
        // 2^61 - 1 has two-adicity 1.
        let mersenne = PrimeField::new(2305843009213693951u64).unwrap();
        assert_eq!(
            fft_root_table(&mersenne, 4),
            Err(FieldError::NoRootOfUnity(2))
        );
    }
}
