use std::collections::HashSet;

use log::debug;
use zkstark_maybe_rayon::*;
use zkstark_util::log2_ceil;

use crate::batch_util::batch_multiplicative_inverse;
use crate::error::FieldError;
use crate::polynomial::{Polynomial, PolynomialValues};
use crate::types::{assert_same_field, FieldElement, PrimeField};

/// An `(x, y)` pair to interpolate through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: FieldElement,
    pub y: FieldElement,
}

impl Point {
    pub fn new(x: FieldElement, y: FieldElement) -> Self {
        assert_same_field(x.field(), y.field());
        Self { x, y }
    }
}

fn check_distinct<'a>(xs: impl IntoIterator<Item = &'a FieldElement>) -> Result<(), FieldError> {
    let mut seen = HashSet::new();
    for x in xs {
        if !seen.insert(x) {
            return Err(FieldError::DuplicatePoint);
        }
    }
    Ok(())
}

/// Classical Lagrange interpolation in `O(n^2)`. Returns the unique polynomial of degree `< n`
/// through the `n` given points.
pub fn lagrange_interpolate(field: &PrimeField, points: &[Point]) -> Result<Polynomial, FieldError> {
    check_distinct(points.iter().map(|p| &p.x))?;
    let n = points.len();
    if n == 0 {
        return Ok(Polynomial::zero(field));
    }

    // The master polynomial l(X) = prod_j (X - x_j).
    let mut master = vec![field.one()];
    for p in points {
        assert_same_field(field, p.x.field());
        let mut next = vec![field.zero(); master.len() + 1];
        for (i, c) in master.iter().enumerate() {
            next[i + 1] += c;
            next[i] -= c * &p.x;
        }
        master = next;
    }
    let master = Polynomial::new(field, master);

    let weights = barycentric_weights(&points.iter().map(|p| p.x.clone()).collect::<Vec<_>>())?;
    let mut coeffs = vec![field.zero(); n];
    for (p, w) in points.iter().zip(&weights) {
        // l(X) / (X - x_i) is the basis numerator; the weight normalises it.
        let basis = master.divide_by_linear(&p.x);
        let scale = w * &p.y;
        for (acc, c) in coeffs.iter_mut().zip(basis.coeffs()) {
            *acc += c * &scale;
        }
    }
    Ok(Polynomial::new(field, coeffs))
}

/// Barycentric weights `w_i = 1 / prod_{j != i} (x_i - x_j)`.
pub fn barycentric_weights(xs: &[FieldElement]) -> Result<Vec<FieldElement>, FieldError> {
    check_distinct(xs)?;
    let denominators = xs
        .par_iter()
        .enumerate()
        .map(|(i, x_i)| {
            xs.iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(x_i.field().one(), |acc, (_, x_j)| acc * (x_i - x_j))
        })
        .collect::<Vec<_>>();
    batch_multiplicative_inverse(&denominators)
}

/// Evaluates the interpolant of a fixed point set at arbitrary points, in `O(n)` per point once
/// the weights are cached.
#[derive(Clone, Debug)]
pub struct BarycentricInterpolator {
    field: PrimeField,
    points: Vec<Point>,
    weights: Vec<FieldElement>,
}

impl BarycentricInterpolator {
    pub fn new(field: &PrimeField, points: Vec<Point>) -> Result<Self, FieldError> {
        for p in &points {
            assert_same_field(field, p.x.field());
        }
        let weights = barycentric_weights(&points.iter().map(|p| p.x.clone()).collect::<Vec<_>>())?;
        Ok(Self {
            field: field.clone(),
            points,
            weights,
        })
    }

    pub fn weights(&self) -> &[FieldElement] {
        &self.weights
    }

    /// Evaluates the interpolant at `x`.
    pub fn evaluate(&self, x: &FieldElement) -> Result<FieldElement, FieldError> {
        // On a node the formula would divide by zero.
        if let Some(p) = self.points.iter().find(|p| &p.x == x) {
            return Ok(p.y.clone());
        }
        let diffs = self.points.iter().map(|p| x - &p.x).collect::<Vec<_>>();
        let diff_invs = batch_multiplicative_inverse(&diffs)?;
        Ok(self.combine(&diffs, &diff_invs))
    }

    /// Evaluates the interpolant at every point of `xs`, sharing one batch inversion across all
    /// of them.
    pub fn evaluate_batch(&self, xs: &[FieldElement]) -> Result<Vec<FieldElement>, FieldError> {
        let n = self.points.len();
        if n == 0 {
            return Ok(vec![self.field.zero(); xs.len()]);
        }

        let mut diffs = Vec::with_capacity(xs.len() * n);
        let mut on_node = Vec::with_capacity(xs.len());
        for x in xs {
            let node = self.points.iter().position(|p| &p.x == x);
            on_node.push(node);
            for p in &self.points {
                // Nodes get a dummy denominator; their value is read off directly.
                diffs.push(if node.is_some() {
                    self.field.one()
                } else {
                    x - &p.x
                });
            }
        }
        let diff_invs = batch_multiplicative_inverse(&diffs)?;

        Ok(on_node
            .into_par_iter()
            .enumerate()
            .map(|(k, node)| match node {
                Some(i) => self.points[i].y.clone(),
                None => {
                    let range = k * n..(k + 1) * n;
                    self.combine(&diffs[range.clone()], &diff_invs[range])
                }
            })
            .collect())
    }

    /// `l(x) * sum_i w_i * y_i / (x - x_i)`.
    fn combine(&self, diffs: &[FieldElement], diff_invs: &[FieldElement]) -> FieldElement {
        let l_x = diffs
            .iter()
            .fold(self.field.one(), |acc, d| acc * d);
        let sum = self
            .points
            .iter()
            .zip(&self.weights)
            .zip(diff_invs)
            .fold(self.field.zero(), |acc, ((p, w), inv)| acc + w * inv * &p.y);
        l_x * sum
    }
}

/// Computes the unique degree `< n` interpolant of an arbitrary list of `n` points.
///
/// The interpolant is evaluated on a two-adic subgroup with barycentric weights and then
/// recovered with an IFFT. Fields without a large enough two-adic subgroup fall back to
/// [`lagrange_interpolate`].
pub fn interpolant(field: &PrimeField, points: &[Point]) -> Result<Polynomial, FieldError> {
    let n = points.len();
    if n == 0 {
        return Ok(Polynomial::zero(field));
    }
    let n_log = log2_ceil(n);
    if n_log > field.two_adicity() {
        debug!(
            "{} points exceed the two-adic subgroups of {}; using Lagrange interpolation",
            n, field
        );
        return lagrange_interpolate(field, points);
    }

    let subgroup = field.two_adic_subgroup(n_log)?;
    let interpolator = BarycentricInterpolator::new(field, points.to_vec())?;
    let subgroup_evals = interpolator.evaluate_batch(&subgroup)?;
    PolynomialValues::new(field, subgroup_evals).ifft()
}
