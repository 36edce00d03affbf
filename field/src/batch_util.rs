//! Batched element-wise operations, sharded across worker threads for large inputs.

use num::BigUint;
use zkstark_maybe_rayon::*;

use crate::error::FieldError;
use crate::types::FieldElement;

/// Batches at most this long are inverted on the calling thread.
pub const BATCH_INVERSE_PARALLEL_THRESHOLD: usize = 1000;
/// Batches at most this long are multiplied on the calling thread.
pub const BATCH_MULTIPLY_PARALLEL_THRESHOLD: usize = 1000;
/// Batches at most this long are exponentiated on the calling thread.
pub const BATCH_EXP_PARALLEL_THRESHOLD: usize = 100;

/// Inverts every element using Montgomery's trick: one field inversion per shard plus three
/// multiplications per element.
///
/// Fails with [`FieldError::DivisionByZero`] if any element is zero.
pub fn batch_multiplicative_inverse(
    values: &[FieldElement],
) -> Result<Vec<FieldElement>, FieldError> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let chunk_len = shard_len(values.len(), BATCH_INVERSE_PARALLEL_THRESHOLD);
    let shards = values
        .par_chunks(chunk_len)
        .map(batch_multiplicative_inverse_sequential)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(shards.into_iter().flatten().collect())
}

fn batch_multiplicative_inverse_sequential(
    values: &[FieldElement],
) -> Result<Vec<FieldElement>, FieldError> {
    let n = values.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    // prefix[i] = values[0] * ... * values[i]
    let mut prefix = Vec::with_capacity(n);
    let mut acc = values[0].field().one();
    for x in values {
        if x.is_zero() {
            return Err(FieldError::DivisionByZero);
        }
        acc *= x;
        prefix.push(acc.clone());
    }

    let mut inv = acc.inverse()?;
    let mut result = vec![values[0].field().zero(); n];
    for i in (1..n).rev() {
        result[i] = &inv * &prefix[i - 1];
        inv *= &values[i];
    }
    result[0] = inv;
    Ok(result)
}

/// Element-wise in-place multiplication `out[i] *= a[i]`.
pub fn batch_multiply_inplace(
    out: &mut [FieldElement],
    a: &[FieldElement],
) -> Result<(), FieldError> {
    if out.len() != a.len() {
        return Err(FieldError::LengthMismatch {
            expected: out.len(),
            actual: a.len(),
        });
    }
    let chunk_len = shard_len(out.len(), BATCH_MULTIPLY_PARALLEL_THRESHOLD);
    out.par_chunks_mut(chunk_len)
        .zip(a.par_chunks(chunk_len))
        .for_each(|(out_chunk, a_chunk)| {
            for (x, y) in out_chunk.iter_mut().zip(a_chunk) {
                *x *= y;
            }
        });
    Ok(())
}

/// Element-wise in-place addition `out[i] += a[i]`.
pub fn batch_add_inplace(out: &mut [FieldElement], a: &[FieldElement]) -> Result<(), FieldError> {
    if out.len() != a.len() {
        return Err(FieldError::LengthMismatch {
            expected: out.len(),
            actual: a.len(),
        });
    }
    let chunk_len = shard_len(out.len(), BATCH_MULTIPLY_PARALLEL_THRESHOLD);
    out.par_chunks_mut(chunk_len)
        .zip(a.par_chunks(chunk_len))
        .for_each(|(out_chunk, a_chunk)| {
            for (x, y) in out_chunk.iter_mut().zip(a_chunk) {
                *x += y;
            }
        });
    Ok(())
}

/// Raises every element to the same power.
pub fn batch_exp(values: &[FieldElement], exponent: &BigUint) -> Vec<FieldElement> {
    if values.is_empty() {
        return Vec::new();
    }
    let chunk_len = shard_len(values.len(), BATCH_EXP_PARALLEL_THRESHOLD);
    let shards = values
        .par_chunks(chunk_len)
        .map(|chunk| {
            chunk
                .iter()
                .map(|x| x.exp_biguint(exponent))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    shards.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::types::PrimeField;

    #[test]
    fn inverse_small_and_sharded() {
        let field = PrimeField::new(2013265921u64).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for n in [1, 2, 17, BATCH_INVERSE_PARALLEL_THRESHOLD + 1, 5000] {
            let values = (0..n)
                .map(|_| loop {
                    let x = field.rand(&mut rng);
                    if !x.is_zero() {
                        break x;
                    }
                })
                .collect::<Vec<_>>();
            let inverses = batch_multiplicative_inverse(&values).unwrap();
            assert_eq!(inverses.len(), n);
            for (x, x_inv) in values.iter().zip(&inverses) {
                assert_eq!(x * x_inv, field.one());
            }
        }
    }

    #[test]
    fn inverse_of_zero_fails() {
        let field = PrimeField::new(2013265921u64).unwrap();
        let mut values = field.rand_vec(3000, &mut ChaCha8Rng::seed_from_u64(4));
        values[2500] = field.zero();
        assert_eq!(
            batch_multiplicative_inverse(&values),
            Err(FieldError::DivisionByZero)
        );
    }

    #[test]
    fn multiply_and_exp() {
        let field = PrimeField::new(18446744069414584321u64).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let a = field.rand_vec(2000, &mut rng);
        let b = field.rand_vec(2000, &mut rng);

        let mut product = a.clone();
        batch_multiply_inplace(&mut product, &b).unwrap();
        let mut sum = a.clone();
        batch_add_inplace(&mut sum, &b).unwrap();
        for i in 0..a.len() {
            assert_eq!(product[i], &a[i] * &b[i]);
            assert_eq!(sum[i], &a[i] + &b[i]);
        }

        let cubes = batch_exp(&a, &BigUint::from(3u32));
        for (x, c) in a.iter().zip(&cubes) {
            assert_eq!(x.exp_u64(3), *c);
        }

        assert_eq!(
            batch_multiply_inplace(&mut product, &b[1..]),
            Err(FieldError::LengthMismatch {
                expected: 2000,
                actual: 1999
            })
        );
    }
}
