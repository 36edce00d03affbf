//! Primality testing and small-factor factorisation over arbitrary-precision integers.

use num::{BigUint, Integer, One, Zero};

const SMALL_PRIMES: [u32; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97,
];

/// Trial-division bound used by [`distinct_prime_factors`].
pub const TRIAL_DIVISION_BOUND: u64 = 1 << 16;

/// Miller–Rabin with the first 25 primes as witnesses. Deterministic below `3.3 * 10^24`.
pub fn is_probable_prime(n: &BigUint) -> bool {
    if n < &BigUint::from(2u32) {
        return false;
    }
    for &p in &SMALL_PRIMES {
        if n == &BigUint::from(p) {
            return true;
        }
        if (n % p).is_zero() {
            return false;
        }
    }

    let n_minus_one = n - 1u32;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for &a in &SMALL_PRIMES {
        let mut x = BigUint::from(a).modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = &x * &x % n;
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// The distinct prime factors of `n`, in increasing order.
///
/// Uses trial division up to `bound`; a remaining cofactor is accepted only if it is itself
/// prime. Returns `None` when the factorisation could not be completed.
pub fn distinct_prime_factors(n: &BigUint, bound: u64) -> Option<Vec<BigUint>> {
    let mut factors = Vec::new();
    let mut rest = n.clone();
    if rest.is_zero() {
        return None;
    }

    let mut d = 2u64;
    while d <= bound {
        let d_big = BigUint::from(d);
        if &d_big * &d_big > rest {
            break;
        }
        if (&rest % d).is_zero() {
            factors.push(d_big.clone());
            while (&rest % d).is_zero() {
                rest /= d;
            }
        }
        d += if d == 2 { 1 } else { 2 };
    }

    if !rest.is_one() {
        if !is_probable_prime(&rest) {
            return None;
        }
        factors.push(rest);
    }
    Some(factors)
}

/// Inverse of `a` modulo `m`, if `gcd(a, m) = 1`.
pub fn inverse_mod(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    use num::BigInt;

    if m.is_one() {
        return Some(BigUint::zero());
    }
    let a = BigInt::from(a.clone());
    let m_signed = BigInt::from(m.clone());
    let egcd = a.extended_gcd(&m_signed);
    if !egcd.gcd.is_one() {
        return None;
    }
    egcd.x.mod_floor(&m_signed).to_biguint()
}
