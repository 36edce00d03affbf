use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num::bigint::RandBigInt;
use num::{BigUint, One, ToPrimitive, Zero};
use rand::Rng;
use serde::{Serialize, Serializer};

use crate::error::FieldError;
use crate::prime::{distinct_prime_factors, is_probable_prime, TRIAL_DIVISION_BOUND};

/// Moduli below this bound use machine-word arithmetic: sums fit in a `u64`, products in a `u128`.
const WORD_MODULUS_BOUND: u64 = 1 << 63;

/// How many small integers are tried when searching for a non-residue or a group generator.
const GENERATOR_SEARCH_LIMIT: u64 = 1 << 20;

/// A canonical representative in `[0, p)`. The representation is fixed per field: every residue
/// of a field with a word-sized modulus is a `Word`, every other one is `Big`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) enum Residue {
    Word(u64),
    Big(BigUint),
}

impl Residue {
    pub(crate) fn to_biguint(&self) -> BigUint {
        match self {
            Residue::Word(x) => BigUint::from(*x),
            Residue::Big(x) => x.clone(),
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Residue::Word(x) => *x == 0,
            Residue::Big(x) => x.is_zero(),
        }
    }

    fn is_one(&self) -> bool {
        match self {
            Residue::Word(x) => *x == 1,
            Residue::Big(x) => x.is_one(),
        }
    }
}

/// Raw modular arithmetic on residues.
#[derive(Debug)]
pub(crate) struct Modulus {
    value: BigUint,
    word: Option<u64>,
}

impl Modulus {
    fn new(value: BigUint) -> Self {
        let word = value.to_u64().filter(|&p| p < WORD_MODULUS_BOUND);
        Self { value, word }
    }

    pub(crate) fn reduce(&self, x: &BigUint) -> Residue {
        match self.word {
            Some(p) => Residue::Word((x % p).to_u64().unwrap_or_default()),
            None => Residue::Big(x % &self.value),
        }
    }

    pub(crate) fn from_u64(&self, x: u64) -> Residue {
        match self.word {
            Some(p) => Residue::Word(x % p),
            None => Residue::Big(BigUint::from(x) % &self.value),
        }
    }

    fn add(&self, a: &Residue, b: &Residue) -> Residue {
        match (self.word, a, b) {
            (Some(p), Residue::Word(a), Residue::Word(b)) => {
                let sum = a + b;
                Residue::Word(if sum >= p { sum - p } else { sum })
            }
            (None, Residue::Big(a), Residue::Big(b)) => {
                let sum = a + b;
                Residue::Big(if sum >= self.value {
                    sum - &self.value
                } else {
                    sum
                })
            }
            _ => self.reduce(&(a.to_biguint() + b.to_biguint())),
        }
    }

    fn neg(&self, a: &Residue) -> Residue {
        if a.is_zero() {
            return a.clone();
        }
        match (self.word, a) {
            (Some(p), Residue::Word(a)) => Residue::Word(p - a),
            _ => self.reduce(&(&self.value - a.to_biguint())),
        }
    }

    fn sub(&self, a: &Residue, b: &Residue) -> Residue {
        match (self.word, a, b) {
            (Some(p), Residue::Word(a), Residue::Word(b)) => {
                Residue::Word(if a >= b { a - b } else { a + (p - b) })
            }
            (None, Residue::Big(a), Residue::Big(b)) => Residue::Big(if a >= b {
                a - b
            } else {
                &self.value - b + a
            }),
            _ => self.add(a, &self.neg(b)),
        }
    }

    fn mul(&self, a: &Residue, b: &Residue) -> Residue {
        match (self.word, a, b) {
            (Some(p), Residue::Word(a), Residue::Word(b)) => {
                Residue::Word(((*a as u128 * *b as u128) % p as u128) as u64)
            }
            (None, Residue::Big(a), Residue::Big(b)) => Residue::Big(a * b % &self.value),
            _ => self.reduce(&(a.to_biguint() * b.to_biguint())),
        }
    }

    fn pow(&self, base: &Residue, exponent: &BigUint) -> Residue {
        match (self.word, base) {
            (Some(_), Residue::Word(_)) => {
                let mut result = self.from_u64(1);
                for i in (0..exponent.bits()).rev() {
                    result = self.mul(&result, &result);
                    if exponent.bit(i) {
                        result = self.mul(&result, base);
                    }
                }
                result
            }
            _ => Residue::Big(base.to_biguint().modpow(exponent, &self.value)),
        }
    }

    /// Extended Euclid for word-sized moduli, Fermat's little theorem otherwise.
    fn inverse(&self, a: &Residue) -> Option<Residue> {
        if a.is_zero() {
            return None;
        }
        match (self.word, a) {
            (Some(p), Residue::Word(a)) => {
                let (mut r0, mut r1) = (p as i128, *a as i128);
                let (mut t0, mut t1) = (0i128, 1i128);
                while r1 != 0 {
                    let q = r0 / r1;
                    (r0, r1) = (r1, r0 - q * r1);
                    (t0, t1) = (t1, t0 - q * t1);
                }
                debug_assert_eq!(r0, 1);
                Some(Residue::Word(t0.rem_euclid(p as i128) as u64))
            }
            _ => {
                let exponent = &self.value - 2u32;
                Some(self.pow(a, &exponent))
            }
        }
    }
}

struct FieldParams {
    modulus: Modulus,
    bits: usize,
    two_adicity: usize,
    /// `t` in `p - 1 = 2^s * t` with `t` odd.
    odd_part: BigUint,
    /// A quadratic non-residue.
    nonresidue: Residue,
    /// A generator of the subgroup of order `2^two_adicity`.
    two_adic_generator: Residue,
    /// A generator of the full multiplicative group, known when `p - 1` factors over small primes.
    multiplicative_generator: Option<Residue>,
}

/// A prime field `F_p` with a runtime modulus.
///
/// This is a cheap, clonable handle. Every [`FieldElement`] carries the handle of the field it
/// belongs to, and arithmetic between elements of different fields panics.
#[derive(Clone)]
pub struct PrimeField(Arc<FieldParams>);

impl PrimeField {
    /// Builds the field `F_p`, returning an error unless `p` is an odd prime.
    pub fn new(modulus: impl Into<BigUint>) -> Result<Self, FieldError> {
        let modulus: BigUint = modulus.into();
        if modulus <= BigUint::from(2u32) || !is_probable_prime(&modulus) {
            return Err(FieldError::InvalidModulus(modulus));
        }

        let bits = modulus.bits() as usize;
        let p_minus_one = &modulus - 1u32;
        let two_adicity = p_minus_one.trailing_zeros().unwrap_or(0) as usize;
        let odd_part = &p_minus_one >> two_adicity;
        let half_order = &p_minus_one >> 1;
        let modulus = Modulus::new(modulus);

        let search_limit = modulus
            .value
            .to_u64()
            .map_or(GENERATOR_SEARCH_LIMIT, |p| p.min(GENERATOR_SEARCH_LIMIT));
        let minus_one = modulus.reduce(&p_minus_one);
        let nonresidue = (2..search_limit)
            .map(|z| modulus.from_u64(z))
            .find(|z| modulus.pow(z, &half_order) == minus_one)
            .ok_or_else(|| FieldError::InvalidModulus(modulus.value.clone()))?;
        let two_adic_generator = modulus.pow(&nonresidue, &odd_part);

        let multiplicative_generator = distinct_prime_factors(&p_minus_one, TRIAL_DIVISION_BOUND)
            .and_then(|factors| {
                let cofactors = factors.iter().map(|q| &p_minus_one / q).collect::<Vec<_>>();
                (2..search_limit).map(|g| modulus.from_u64(g)).find(|g| {
                    cofactors
                        .iter()
                        .all(|cofactor| !modulus.pow(g, cofactor).is_one())
                })
            });

        Ok(Self(Arc::new(FieldParams {
            modulus,
            bits,
            two_adicity,
            odd_part,
            nonresidue,
            two_adic_generator,
            multiplicative_generator,
        })))
    }

    pub fn modulus(&self) -> &BigUint {
        &self.0.modulus.value
    }

    /// Bit length of the modulus.
    pub fn bits(&self) -> usize {
        self.0.bits
    }

    /// Length of the canonical byte encoding of an element.
    pub fn num_bytes(&self) -> usize {
        (self.0.bits + 7) / 8
    }

    /// The largest `s` such that `2^s` divides `p - 1`.
    pub fn two_adicity(&self) -> usize {
        self.0.two_adicity
    }

    /// The odd part `t` of `p - 1 = 2^s * t`.
    pub fn odd_part(&self) -> &BigUint {
        &self.0.odd_part
    }

    /// Whether elements use the machine-word representation.
    pub fn is_word_sized(&self) -> bool {
        self.0.modulus.word.is_some()
    }

    pub(crate) fn raw(&self) -> &Modulus {
        &self.0.modulus
    }

    pub(crate) fn wrap(&self, residue: Residue) -> FieldElement {
        FieldElement {
            field: self.clone(),
            residue,
        }
    }

    pub fn zero(&self) -> FieldElement {
        self.from_u64(0)
    }

    pub fn one(&self) -> FieldElement {
        self.from_u64(1)
    }

    pub fn two(&self) -> FieldElement {
        self.from_u64(2)
    }

    pub fn neg_one(&self) -> FieldElement {
        -self.one()
    }

    /// Reduces `x` modulo `p`.
    pub fn from_u64(&self, x: u64) -> FieldElement {
        self.wrap(self.raw().from_u64(x))
    }

    pub fn from_usize(&self, x: usize) -> FieldElement {
        self.from_u64(x as u64)
    }

    pub fn from_i64(&self, x: i64) -> FieldElement {
        let magnitude = self.from_u64(x.unsigned_abs());
        if x < 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Reduces `x` modulo `p`.
    pub fn from_biguint(&self, x: &BigUint) -> FieldElement {
        self.wrap(self.raw().reduce(x))
    }

    /// Interprets `bytes` as a little-endian integer and reduces it modulo `p`.
    pub fn from_bytes_le(&self, bytes: &[u8]) -> FieldElement {
        self.from_biguint(&BigUint::from_bytes_le(bytes))
    }

    /// Samples a uniformly random element.
    pub fn rand<R: Rng + ?Sized>(&self, rng: &mut R) -> FieldElement {
        self.from_biguint(&rng.gen_biguint_below(self.modulus()))
    }

    pub fn rand_vec<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<FieldElement> {
        (0..n).map(|_| self.rand(rng)).collect()
    }

    /// A fixed quadratic non-residue.
    pub fn nonresidue(&self) -> FieldElement {
        self.wrap(self.0.nonresidue.clone())
    }

    /// A generator of the full multiplicative group, if `p - 1` could be factored.
    pub fn multiplicative_generator(&self) -> Option<FieldElement> {
        self.0
            .multiplicative_generator
            .clone()
            .map(|g| self.wrap(g))
    }

    /// The shift used for cosets disjoint from two-adic subgroups: the multiplicative generator
    /// when known, otherwise the fixed non-residue. Either lies outside every proper two-adic
    /// subgroup.
    pub fn coset_shift(&self) -> FieldElement {
        self.multiplicative_generator()
            .unwrap_or_else(|| self.nonresidue())
    }

    /// A primitive `2^n_log`-th root of unity. Roots for different orders are compatible:
    /// squaring the root of order `2^k` gives the root of order `2^(k-1)`.
    pub fn primitive_root_of_unity(&self, n_log: usize) -> Result<FieldElement, FieldError> {
        if n_log > self.two_adicity() {
            return Err(FieldError::NoRootOfUnity(n_log));
        }
        let base = self.wrap(self.0.two_adic_generator.clone());
        Ok(base.exp_power_of_2(self.two_adicity() - n_log))
    }

    /// Computes a multiplicative subgroup whose order is known in advance.
    pub fn cyclic_subgroup_known_order(
        &self,
        generator: &FieldElement,
        order: usize,
    ) -> Vec<FieldElement> {
        generator.powers().take(order).collect()
    }

    /// The subgroup `{ω^i}` of order `2^n_log`.
    pub fn two_adic_subgroup(&self, n_log: usize) -> Result<Vec<FieldElement>, FieldError> {
        let generator = self.primitive_root_of_unity(n_log)?;
        Ok(self.cyclic_subgroup_known_order(&generator, 1 << n_log))
    }

    /// The coset `shift · {ω^i}` of the subgroup of order `2^n_log`.
    pub fn two_adic_coset(
        &self,
        shift: &FieldElement,
        n_log: usize,
    ) -> Result<Vec<FieldElement>, FieldError> {
        let generator = self.primitive_root_of_unity(n_log)?;
        Ok(generator
            .powers()
            .take(1 << n_log)
            .map(|x| shift * x)
            .collect())
    }
}

impl PartialEq for PrimeField {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.modulus() == other.modulus()
    }
}

impl Eq for PrimeField {}

impl Hash for PrimeField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.modulus().hash(state);
    }
}

impl Debug for PrimeField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "F_{}", self.modulus())
    }
}

impl Display for PrimeField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Panics unless both operands live in the same field.
#[inline]
#[track_caller]
pub(crate) fn assert_same_field(a: &PrimeField, b: &PrimeField) {
    assert!(
        a == b,
        "field mismatch: operands belong to {:?} and {:?}",
        a,
        b
    );
}

/// An element of a [`PrimeField`], always stored canonically in `[0, p)`.
#[derive(Clone)]
pub struct FieldElement {
    field: PrimeField,
    residue: Residue,
}

impl FieldElement {
    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    /// The canonical representative.
    pub fn value(&self) -> BigUint {
        self.residue.to_biguint()
    }

    /// The canonical representative, if it fits in a `u64`.
    pub fn to_u64(&self) -> Option<u64> {
        match &self.residue {
            Residue::Word(x) => Some(*x),
            Residue::Big(x) => x.to_u64(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.residue.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.residue.is_one()
    }

    pub fn square(&self) -> Self {
        self * self
    }

    pub fn double(&self) -> Self {
        self + self
    }

    pub fn exp_biguint(&self, exponent: &BigUint) -> Self {
        self.field
            .wrap(self.field.raw().pow(&self.residue, exponent))
    }

    pub fn exp_u64(&self, exponent: u64) -> Self {
        self.exp_biguint(&BigUint::from(exponent))
    }

    /// Computes `self^(2^power_log)` by repeated squaring.
    pub fn exp_power_of_2(&self, power_log: usize) -> Self {
        let mut res = self.clone();
        for _ in 0..power_log {
            res = res.square();
        }
        res
    }

    pub fn try_inverse(&self) -> Option<Self> {
        self.field
            .raw()
            .inverse(&self.residue)
            .map(|r| self.field.wrap(r))
    }

    /// The multiplicative inverse, or [`FieldError::DivisionByZero`] for zero.
    pub fn inverse(&self) -> Result<Self, FieldError> {
        self.try_inverse().ok_or(FieldError::DivisionByZero)
    }

    /// `self / rhs`, or [`FieldError::DivisionByZero`] when `rhs` is zero.
    #[track_caller]
    pub fn try_div(&self, rhs: &Self) -> Result<Self, FieldError> {
        assert_same_field(&self.field, &rhs.field);
        Ok(self * rhs.inverse()?)
    }

    /// The infinite sequence `1, self, self^2, ...`.
    pub fn powers(&self) -> Powers {
        Powers {
            base: self.clone(),
            current: self.field.one(),
        }
    }

    /// The canonical value as little-endian bytes, zero-padded to [`PrimeField::num_bytes`].
    pub fn to_bytes_le(&self) -> Vec<u8> {
        let mut bytes = self.value().to_bytes_le();
        bytes.resize(self.field.num_bytes(), 0);
        bytes
    }

    pub(crate) fn from_parts(field: &PrimeField, residue: Residue) -> Self {
        field.wrap(residue)
    }

    #[track_caller]
    pub(crate) fn add_residue(&self, rhs: &Self) -> Residue {
        assert_same_field(&self.field, &rhs.field);
        self.field.raw().add(&self.residue, &rhs.residue)
    }

    #[track_caller]
    pub(crate) fn sub_residue(&self, rhs: &Self) -> Residue {
        assert_same_field(&self.field, &rhs.field);
        self.field.raw().sub(&self.residue, &rhs.residue)
    }

    #[track_caller]
    pub(crate) fn mul_residue(&self, rhs: &Self) -> Residue {
        assert_same_field(&self.field, &rhs.field);
        self.field.raw().mul(&self.residue, &rhs.residue)
    }

    pub(crate) fn neg_residue(&self) -> Residue {
        self.field.raw().neg(&self.residue)
    }
}

/// An iterator over the powers of a field element.
#[derive(Clone)]
pub struct Powers {
    base: FieldElement,
    current: FieldElement,
}

impl Iterator for Powers {
    type Item = FieldElement;

    fn next(&mut self) -> Option<FieldElement> {
        let result = self.current.clone();
        self.current = &self.current * &self.base;
        Some(result)
    }
}

impl PartialEq for FieldElement {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.residue == other.residue
    }
}

impl Eq for FieldElement {}

impl Hash for FieldElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.residue.hash(state);
    }
}

impl Debug for FieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Display for FieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value().to_str_radix(10))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    const BABY_BEAR: u64 = 2013265921;
    const GOLDILOCKS: u64 = 18446744069414584321;
    const BN254_SCALAR: &[u8] =
        b"21888242871839275222246405745257275088548364400416034343698204186575808495617";

    fn test_fields() -> Vec<PrimeField> {
        vec![
            PrimeField::new(17u64).unwrap(),
            PrimeField::new(BABY_BEAR).unwrap(),
            PrimeField::new(GOLDILOCKS).unwrap(),
            PrimeField::new(BigUint::parse_bytes(BN254_SCALAR, 10).unwrap()).unwrap(),
        ]
    }

    #[test]
    fn rejects_invalid_moduli() {
        for m in [0u64, 1, 2, 4, 15, 2013265923] {
            assert_eq!(
                PrimeField::new(m).unwrap_err(),
                FieldError::InvalidModulus(m.into())
            );
        }
    }

    #[test]
    fn representation_follows_modulus_size() {
        let fields = test_fields();
        assert!(fields[0].is_word_sized());
        assert!(fields[1].is_word_sized());
        assert!(!fields[2].is_word_sized());
        assert!(!fields[3].is_word_sized());
    }

    #[test]
    fn ring_axioms() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for field in test_fields() {
            for _ in 0..50 {
                let a = field.rand(&mut rng);
                let b = field.rand(&mut rng);
                let c = field.rand(&mut rng);
                assert_eq!((&a + &b) + &c, &a + (&b + &c));
                assert_eq!(&a * (&b + &c), &a * &b + &a * &c);
                assert_eq!(&a * &b, &b * &a);
                assert_eq!(&a - &a, field.zero());
                assert_eq!(&a + -&a, field.zero());
                assert_eq!(&a - &b, &a + -&b);
            }
        }
    }

    #[test]
    fn inverses() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for field in test_fields() {
            for _ in 0..50 {
                let a = field.rand(&mut rng);
                if a.is_zero() {
                    continue;
                }
                assert_eq!(&a * a.inverse().unwrap(), field.one());
                let b = field.rand(&mut rng);
                assert_eq!(b.try_div(&a).unwrap() * &a, b);
            }
            assert_eq!(field.zero().inverse(), Err(FieldError::DivisionByZero));
            assert_eq!(
                field.one().try_div(&field.zero()),
                Err(FieldError::DivisionByZero)
            );
        }
    }

    #[test]
    fn exponentiation_matches_repeated_multiplication() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for field in test_fields() {
            let a = field.rand(&mut rng);
            let mut acc = field.one();
            for e in 0..20u64 {
                assert_eq!(a.exp_u64(e), acc);
                acc *= &a;
            }
            assert_eq!(a.exp_power_of_2(3), a.exp_u64(8));
            // Fermat
            if !a.is_zero() {
                assert_eq!(a.exp_biguint(&(field.modulus() - 1u32)), field.one());
            }
        }
    }

    #[test]
    fn roots_of_unity() {
        for field in test_fields() {
            let max = field.two_adicity().min(10);
            for n_log in 0..=max {
                let root = field.primitive_root_of_unity(n_log).unwrap();
                assert!(root.exp_power_of_2(n_log).is_one());
                if n_log > 0 {
                    assert!(!root.exp_power_of_2(n_log - 1).is_one());
                    let half = field.primitive_root_of_unity(n_log - 1).unwrap();
                    assert_eq!(root.square(), half);
                }
            }
            assert_eq!(
                field.primitive_root_of_unity(field.two_adicity() + 1),
                Err(FieldError::NoRootOfUnity(field.two_adicity() + 1))
            );
        }
    }

    #[test]
    fn generators() {
        let baby_bear = PrimeField::new(BABY_BEAR).unwrap();
        assert_eq!(baby_bear.two_adicity(), 27);
        assert_eq!(baby_bear.multiplicative_generator(), Some(baby_bear.from_u64(31)));

        let f17 = PrimeField::new(17u64).unwrap();
        assert_eq!(f17.multiplicative_generator(), Some(f17.from_u64(3)));
        assert_eq!(f17.nonresidue(), f17.from_u64(3));
    }

    #[test]
    fn coset_is_disjoint_from_subgroup() {
        let field = PrimeField::new(BABY_BEAR).unwrap();
        let subgroup = field.two_adic_subgroup(4).unwrap();
        let coset = field.two_adic_coset(&field.coset_shift(), 4).unwrap();
        assert_eq!(coset.len(), 16);
        assert!(coset.iter().all(|x| !subgroup.contains(x)));
    }

    #[test]
    fn canonical_encoding() {
        let field = PrimeField::new(BABY_BEAR).unwrap();
        let x = field.from_u64(BABY_BEAR + 5);
        assert_eq!(x, field.from_u64(5));
        assert_eq!(x.to_bytes_le(), vec![5, 0, 0, 0]);
        assert_eq!(field.from_bytes_le(&x.to_bytes_le()), x);
        assert_eq!(field.from_i64(-1), field.neg_one());
    }

    #[test]
    #[should_panic(expected = "field mismatch")]
    fn mixing_fields_panics() {
        let a = PrimeField::new(17u64).unwrap().one();
        let b = PrimeField::new(BABY_BEAR).unwrap().one();
        let _ = &a + &b;
    }
}
