pub(crate) mod division;

use std::fmt::{self, Debug, Formatter};
use std::ops::{Add, Mul, Neg, Sub};

use itertools::{EitherOrBoth, Itertools};
use zkstark_maybe_rayon::*;
use zkstark_util::log2_ceil;

use crate::error::FieldError;
use crate::fft::{fft_with_options, ifft_with_options, FftRootTable};
use crate::types::{assert_same_field, FieldElement, PrimeField};

/// Products whose result has at least this many coefficients go through the FFT.
const FFT_MUL_THRESHOLD: usize = 64;

/// A polynomial in point-value form.
///
/// Unless stated otherwise the points are implicitly `g^i`, where `g` generates the two-adic
/// subgroup whose size equals the number of values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolynomialValues {
    field: PrimeField,
    pub values: Vec<FieldElement>,
}

impl PolynomialValues {
    #[track_caller]
    pub fn new(field: &PrimeField, values: Vec<FieldElement>) -> Self {
        for v in &values {
            assert_same_field(field, v.field());
        }
        Self {
            field: field.clone(),
            values,
        }
    }

    pub fn zero(field: &PrimeField, len: usize) -> Self {
        Self::new(field, vec![field.zero(); len])
    }

    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    /// The number of values stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ifft(self) -> Result<Polynomial, FieldError> {
        let field = self.field.clone();
        let coeffs = ifft_with_options(&field, self.values, None)?;
        Ok(Polynomial::new(&field, coeffs))
    }

    /// Returns the polynomial whose evaluation on the coset `shift * H` is `self`.
    pub fn coset_ifft(self, shift: &FieldElement) -> Result<Polynomial, FieldError> {
        let field = self.field.clone();
        let shift_inv = shift.inverse()?;
        let coeffs = ifft_with_options(&field, self.values, None)?
            .into_iter()
            .zip(shift_inv.powers())
            .map(|(c, r)| c * r)
            .collect();
        Ok(Polynomial::new(&field, coeffs))
    }
}

/// A polynomial in coefficient form, lowest degree first.
///
/// The coefficient vector is always trimmed: the leading coefficient is non-zero, except for
/// the zero polynomial, which is the single coefficient `0`. All operations return new
/// polynomials.
#[derive(Clone, PartialEq, Eq)]
pub struct Polynomial {
    field: PrimeField,
    coeffs: Vec<FieldElement>,
}

impl Polynomial {
    /// Builds a polynomial from coefficients, trimming trailing zeros. Panics if a coefficient
    /// belongs to another field.
    #[track_caller]
    pub fn new(field: &PrimeField, mut coeffs: Vec<FieldElement>) -> Self {
        for c in &coeffs {
            assert_same_field(field, c.field());
        }
        while coeffs.len() > 1 && coeffs.last().map_or(false, |c| c.is_zero()) {
            coeffs.pop();
        }
        if coeffs.is_empty() {
            coeffs.push(field.zero());
        }
        Self {
            field: field.clone(),
            coeffs,
        }
    }

    pub fn from_u64s(field: &PrimeField, coeffs: &[u64]) -> Self {
        Self::new(field, coeffs.iter().map(|&c| field.from_u64(c)).collect())
    }

    pub fn zero(field: &PrimeField) -> Self {
        Self::new(field, vec![])
    }

    pub fn constant(c: FieldElement) -> Self {
        let field = c.field().clone();
        Self::new(&field, vec![c])
    }

    /// The polynomial `x`.
    pub fn x(field: &PrimeField) -> Self {
        Self::new(field, vec![field.zero(), field.one()])
    }

    /// `c * x^degree`.
    pub fn monomial(c: FieldElement, degree: usize) -> Self {
        let field = c.field().clone();
        let mut coeffs = vec![field.zero(); degree + 1];
        coeffs[degree] = c;
        Self::new(&field, coeffs)
    }

    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    pub fn coeffs(&self) -> &[FieldElement] {
        &self.coeffs
    }

    pub fn into_coeffs(self) -> Vec<FieldElement> {
        self.coeffs
    }

    /// The number of stored coefficients, i.e. `degree + 1`.
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    /// `len() - 1`. The zero polynomial has degree 0 under this convention.
    pub fn degree(&self) -> isize {
        self.coeffs.len() as isize - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.len() == 1 && self.coeffs[0].is_zero()
    }

    pub fn leading_coefficient(&self) -> &FieldElement {
        &self.coeffs[self.coeffs.len() - 1]
    }

    /// Horner evaluation.
    #[track_caller]
    pub fn eval(&self, x: &FieldElement) -> FieldElement {
        assert_same_field(&self.field, x.field());
        self.coeffs
            .iter()
            .rev()
            .fold(self.field.zero(), |acc, c| acc * x + c)
    }

    /// Evaluates at every point of `xs`, in parallel.
    pub fn eval_many(&self, xs: &[FieldElement]) -> Vec<FieldElement> {
        xs.par_iter().map(|x| self.eval(x)).collect()
    }

    /// Multiplies every coefficient by `c`.
    pub fn scale(&self, c: &FieldElement) -> Self {
        Self::new(&self.field, self.coeffs.iter().map(|x| x * c).collect())
    }

    /// Returns `p(c * x)`.
    pub fn scale_argument(&self, c: &FieldElement) -> Self {
        Self::new(
            &self.field,
            self.coeffs
                .iter()
                .zip(c.powers())
                .map(|(x, r)| x * r)
                .collect(),
        )
    }

    /// The coefficients, zero-padded to `len`.
    pub fn padded_coeffs(&self, len: usize) -> Result<Vec<FieldElement>, FieldError> {
        if len < self.len() {
            return Err(FieldError::LengthMismatch {
                expected: len,
                actual: self.len(),
            });
        }
        let mut coeffs = self.coeffs.clone();
        coeffs.resize(len, self.field.zero());
        Ok(coeffs)
    }

    /// Evaluates on the two-adic subgroup of order `n`.
    pub fn fft(&self, n: usize) -> Result<PolynomialValues, FieldError> {
        self.fft_with_options(n, None)
    }

    pub fn fft_with_options(
        &self,
        n: usize,
        root_table: Option<&FftRootTable>,
    ) -> Result<PolynomialValues, FieldError> {
        fft_with_options(&self.field, self.padded_coeffs(n)?, root_table)
    }

    /// Evaluates on the coset `shift * H`, where `H` is the two-adic subgroup of order `n`.
    pub fn coset_fft(
        &self,
        shift: &FieldElement,
        n: usize,
    ) -> Result<PolynomialValues, FieldError> {
        self.scale_argument(shift).fft(n)
    }

    /// Low-degree extension: evaluates on the coset `shift * K`, where `|K|` is `2^rate_bits`
    /// times the smallest power of two covering the coefficients.
    pub fn lde_onto_coset(
        &self,
        shift: &FieldElement,
        rate_bits: usize,
    ) -> Result<PolynomialValues, FieldError> {
        self.coset_fft(shift, self.len().next_power_of_two() << rate_bits)
    }

    fn mul_naive(&self, rhs: &Self) -> Self {
        let mut coeffs = vec![self.field.zero(); self.len() + rhs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            if a.is_zero() {
                continue;
            }
            for (j, b) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Self::new(&self.field, coeffs)
    }

    fn mul_fft(&self, rhs: &Self, n: usize) -> Result<Self, FieldError> {
        let a = self.fft(n)?;
        let b = rhs.fft(n)?;
        let values = a
            .values
            .into_par_iter()
            .zip(b.values)
            .map(|(x, y)| x * y)
            .collect();
        PolynomialValues::new(&self.field, values).ifft()
    }
}

impl Debug for Polynomial {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.coeffs).finish()
    }
}

impl Add for &Polynomial {
    type Output = Polynomial;

    #[track_caller]
    fn add(self, rhs: Self) -> Polynomial {
        assert_same_field(&self.field, &rhs.field);
        let coeffs = self
            .coeffs
            .iter()
            .zip_longest(&rhs.coeffs)
            .map(|pair| match pair {
                EitherOrBoth::Both(a, b) => a + b,
                EitherOrBoth::Left(a) | EitherOrBoth::Right(a) => a.clone(),
            })
            .collect();
        Polynomial::new(&self.field, coeffs)
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    #[track_caller]
    fn sub(self, rhs: Self) -> Polynomial {
        assert_same_field(&self.field, &rhs.field);
        let coeffs = self
            .coeffs
            .iter()
            .zip_longest(&rhs.coeffs)
            .map(|pair| match pair {
                EitherOrBoth::Both(a, b) => a - b,
                EitherOrBoth::Left(a) => a.clone(),
                EitherOrBoth::Right(b) => -b,
            })
            .collect();
        Polynomial::new(&self.field, coeffs)
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        Polynomial::new(&self.field, self.coeffs.iter().map(|c| -c).collect())
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    /// Schoolbook multiplication for small products, FFT multiplication for large ones when the
    /// field has roots of unity of the required order.
    #[track_caller]
    fn mul(self, rhs: Self) -> Polynomial {
        assert_same_field(&self.field, &rhs.field);
        if self.is_zero() || rhs.is_zero() {
            return Polynomial::zero(&self.field);
        }
        let result_len = self.len() + rhs.len() - 1;
        let n_log = log2_ceil(result_len);
        if result_len >= FFT_MUL_THRESHOLD && n_log <= self.field.two_adicity() {
            if let Ok(product) = self.mul_fft(rhs, 1 << n_log) {
                return product;
            }
        }
        self.mul_naive(rhs)
    }
}

impl Mul<&FieldElement> for &Polynomial {
    type Output = Polynomial;

    #[track_caller]
    fn mul(self, rhs: &FieldElement) -> Polynomial {
        assert_same_field(&self.field, rhs.field());
        self.scale(rhs)
    }
}
