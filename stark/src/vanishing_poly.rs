use anyhow::Result;
use zkstark::field::batch_util::batch_multiplicative_inverse;
use zkstark::field::FieldElement;
use zkstark_maybe_rayon::*;

use crate::config::StarkContext;
use crate::constraint_consumer::ConstraintConsumer;
use crate::stark::{BoundaryConstraint, EvaluationFrame, Stark};

/// The subgroup points `g^j` of rows where no frame starts: from `num_rows - 2` up to the end
/// of the trace subgroup.
pub(crate) fn transition_exemptions(ctx: &StarkContext, num_rows: usize) -> Vec<FieldElement> {
    let first = (num_rows + 1).saturating_sub(EvaluationFrame::ROWS);
    (first..ctx.trace_length())
        .map(|j| ctx.trace_point(j))
        .collect()
}

fn transition_filter(
    x: &FieldElement,
    z_h_inverse: &FieldElement,
    exemptions: &[FieldElement],
) -> FieldElement {
    exemptions
        .iter()
        .fold(z_h_inverse.clone(), |acc, e| acc * (x - e))
}

/// The composition `sum_k alpha_k C_k(x)` at one point, given `1 / (x - g^row)` for every
/// boundary constraint and the transition filter at `x`.
pub(crate) fn eval_composition<S: Stark>(
    stark: &S,
    boundary: &[BoundaryConstraint],
    vars: &EvaluationFrame,
    boundary_inverses: &[FieldElement],
    transition_filter: FieldElement,
    alphas: &[FieldElement],
) -> FieldElement {
    let mut consumer = ConstraintConsumer::new(alphas, transition_filter);
    for (constraint, inverse) in boundary.iter().zip(boundary_inverses) {
        consumer.constraint_boundary(&vars.local_value, &constraint.value, inverse);
    }
    stark.eval_transition(vars, &mut consumer);
    consumer.accumulator()
}

/// Evaluates the composition on the whole evaluation domain from the trace LDE.
pub(crate) fn compute_composition_values<S: Stark>(
    stark: &S,
    ctx: &StarkContext,
    trace_lde: &[FieldElement],
    boundary: &[BoundaryConstraint],
    alphas: &[FieldElement],
) -> Result<Vec<FieldElement>> {
    let size = ctx.lde_size();
    let step = ctx.blowup();
    let domain = &ctx.evaluation_domain;

    // One batch inversion per boundary constraint, over every point of the domain.
    let boundary_inverses = boundary
        .iter()
        .map(|constraint| {
            let g_row = ctx.trace_point(constraint.row);
            let denominators = domain.iter().map(|x| x - &g_row).collect::<Vec<_>>();
            batch_multiplicative_inverse(&denominators)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let exemptions = transition_exemptions(ctx, stark.num_rows());

    Ok((0..size)
        .into_par_iter()
        .map(|i| {
            let x = &domain[i];
            let vars = EvaluationFrame::from_values(
                trace_lde[i].clone(),
                trace_lde[(i + step) % size].clone(),
                trace_lde[(i + 2 * step) % size].clone(),
            );
            let inverses = boundary_inverses
                .iter()
                .map(|column| column[i].clone())
                .collect::<Vec<_>>();
            let filter = transition_filter(x, ctx.zero_poly.eval_inverse(i), &exemptions);
            eval_composition(stark, boundary, &vars, &inverses, filter, alphas)
        })
        .collect())
}

/// Evaluates the composition at a single point `x` of the evaluation domain.
pub(crate) fn eval_composition_at_point<S: Stark>(
    stark: &S,
    ctx: &StarkContext,
    x: &FieldElement,
    vars: &EvaluationFrame,
    boundary: &[BoundaryConstraint],
    alphas: &[FieldElement],
) -> Result<FieldElement> {
    let z_h = x.exp_u64(ctx.trace_length() as u64) - ctx.field.one();
    let exemptions = transition_exemptions(ctx, stark.num_rows());
    let filter = transition_filter(x, &z_h.inverse()?, &exemptions);
    let inverses = boundary
        .iter()
        .map(|constraint| (x - ctx.trace_point(constraint.row)).inverse())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(eval_composition(
        stark, boundary, vars, &inverses, filter, alphas,
    ))
}

#[cfg(test)]
mod tests {
    use zkstark::field::polynomial::PolynomialValues;

    use super::*;
    use crate::config::StarkConfig;
    use crate::prover::trace_lde;
    use crate::square_fibonacci_stark::SquareFibonacciStark;

    fn small_context() -> Result<StarkContext> {
        StarkConfig {
            trace_length: 32,
            evaluation_domain_size: 128,
            blowup_factor: 4,
            ..StarkConfig::standard_config()
        }
        .build()
    }

    #[test]
    fn exemptions_cover_the_tail() -> Result<()> {
        let ctx = small_context()?;
        let exemptions = transition_exemptions(&ctx, 31);
        assert_eq!(
            exemptions,
            vec![ctx.trace_point(29), ctx.trace_point(30), ctx.trace_point(31)]
        );
        Ok(())
    }

    #[test]
    fn composition_has_low_degree_on_valid_trace() -> Result<()> {
        let ctx = small_context()?;
        let stark = SquareFibonacciStark::new(31);
        let (trace, public_inputs) = stark.generate_trace(&ctx.field, 1, 3141592);
        let lde = trace_lde(&ctx, &trace)?;
        let boundary = stark.boundary_constraints(&public_inputs);
        let alphas = (1..=4).map(|a| ctx.field.from_u64(a)).collect::<Vec<_>>();
        let values = compute_composition_values(&stark, &ctx, &lde, &boundary, &alphas)?;

        let poly = PolynomialValues::new(&ctx.field, values.clone()).coset_ifft(&ctx.shift)?;
        assert!(poly.degree() < ctx.trace_length() as isize);

        // The single-point path agrees with the batched one.
        for i in [0, 1, 57, 127] {
            let step = ctx.blowup();
            let vars = EvaluationFrame::from_values(
                lde[i].clone(),
                lde[(i + step) % 128].clone(),
                lde[(i + 2 * step) % 128].clone(),
            );
            let x = &ctx.evaluation_domain[i];
            assert_eq!(
                eval_composition_at_point(&stark, &ctx, x, &vars, &boundary, &alphas)?,
                values[i]
            );
        }
        Ok(())
    }

    #[test]
    fn composition_has_high_degree_on_invalid_trace() -> Result<()> {
        let ctx = small_context()?;
        let stark = SquareFibonacciStark::new(31);
        let (mut trace, public_inputs) = stark.generate_trace(&ctx.field, 1, 3141592);
        trace[10] += ctx.field.one();
        let lde = trace_lde(&ctx, &trace)?;
        let boundary = stark.boundary_constraints(&public_inputs);
        let alphas = (1..=4).map(|a| ctx.field.from_u64(a)).collect::<Vec<_>>();
        let values = compute_composition_values(&stark, &ctx, &lde, &boundary, &alphas)?;
        let poly = PolynomialValues::new(&ctx.field, values).coset_ifft(&ctx.shift)?;
        assert!(poly.degree() >= ctx.trace_length() as isize);
        Ok(())
    }
}
