use anyhow::{ensure, Result};
use itertools::Itertools;
use log::{debug, info};
use zkstark::field::interpolation::{interpolant, Point};
use zkstark::field::polynomial::PolynomialValues;
use zkstark::field::FieldElement;
use zkstark::fri::draw_query_indices;
use zkstark::fri::proof::{LayerId, QueryProof};
use zkstark::fri::prover::FriProver;
use zkstark::hash::merkle_tree::MerkleTree;
use zkstark::iop::channel::Channel;
use zkstark::timed;
use zkstark::util::timing::TimingTree;

use crate::config::StarkContext;
use crate::get_challenges::{get_alphas, observe_instance};
use crate::proof::{StarkProof, TRACE_OPENINGS_PER_QUERY};
use crate::stark::{EvaluationFrame, Stark};
use crate::vanishing_poly::compute_composition_values;

/// Interpolates the trace over `g^0, ..., g^(rows - 1)` and evaluates it on the evaluation
/// domain.
pub(crate) fn trace_lde(ctx: &StarkContext, trace: &[FieldElement]) -> Result<Vec<FieldElement>> {
    let points = trace
        .iter()
        .zip(ctx.trace_generator.powers())
        .map(|(y, x)| Point::new(x, y.clone()))
        .collect_vec();
    let trace_poly = interpolant(&ctx.field, &points)?;
    Ok(trace_poly.coset_fft(&ctx.shift, ctx.lde_size())?.values)
}

pub fn prove<S: Stark>(
    stark: &S,
    ctx: &StarkContext,
    trace: Vec<FieldElement>,
    public_inputs: Vec<FieldElement>,
    timing: &mut TimingTree,
) -> Result<StarkProof> {
    let num_rows = stark.num_rows();
    ensure!(
        trace.len() == num_rows,
        "Trace has {} rows, expected {}.",
        trace.len(),
        num_rows
    );
    ensure!(
        (EvaluationFrame::ROWS..ctx.trace_length()).contains(&num_rows),
        "Trace of {} rows does not fit a trace subgroup of size {}.",
        num_rows,
        ctx.trace_length()
    );
    ensure!(
        public_inputs.len() == S::PUBLIC_INPUTS,
        "Expected {} public inputs, got {}.",
        S::PUBLIC_INPUTS,
        public_inputs.len()
    );
    ensure!(
        trace.iter().chain(&public_inputs).all(|x| x.field() == &ctx.field),
        "Trace and public inputs must belong to the configured field."
    );

    let lde = timed!(
        timing,
        "compute trace LDE",
        trace_lde(ctx, &trace)?
    );
    let trace_tree = timed!(
        timing,
        "compute trace commitment",
        MerkleTree::new(lde.clone(), ctx.hasher.clone())?
    );
    let trace_root = trace_tree.root().clone();
    debug!("trace root {}", trace_root);

    let mut channel = Channel::new(ctx.hasher.clone());
    observe_instance(&mut channel, &ctx.config, &public_inputs);
    channel.send_digest(&trace_root);

    let boundary = stark.boundary_constraints(&public_inputs);
    let alphas = get_alphas(&mut channel, &ctx.field, stark.num_constraints(&public_inputs));
    let composition = timed!(
        timing,
        "compute composition",
        compute_composition_values(stark, ctx, &lde, &boundary, &alphas)?
    );

    // The composition is a polynomial of degree below the trace length exactly when every
    // constraint holds on the trace.
    let composition_poly = timed!(
        timing,
        "check composition degree",
        PolynomialValues::new(&ctx.field, composition.clone()).coset_ifft(&ctx.shift)?
    );
    ensure!(
        composition_poly.degree() < ctx.trace_length() as isize,
        "Constraints are not satisfied by the trace: composition has degree {}.",
        composition_poly.degree()
    );

    let fri_prover = FriProver::new(ctx.fri_config.clone(), ctx.hasher.clone());
    let fri_commitment = timed!(
        timing,
        "compute FRI commitments",
        fri_prover.commit(ctx.evaluation_domain.clone(), composition, &mut channel)?
    );

    let query_indices = draw_query_indices(
        &mut channel,
        ctx.fri_config.num_query_rounds,
        ctx.lde_size(),
    )?;
    debug!("query indices {:?}", query_indices);

    let size = ctx.lde_size();
    let step = ctx.blowup();
    let query_proofs = timed!(
        timing,
        "open queries",
        query_indices
            .iter()
            .map(|&index| -> Result<Vec<QueryProof>> {
                let mut openings = Vec::new();
                for row in 0..TRACE_OPENINGS_PER_QUERY {
                    let position = (index + row * step) % size;
                    let (value, path) = trace_tree.open(position)?;
                    openings.push(QueryProof {
                        layer: LayerId::Trace,
                        index: Some(position),
                        point: ctx.evaluation_domain[position].clone(),
                        value,
                        path,
                    });
                }
                openings.extend(fri_commitment.open_query(index)?);
                Ok(openings)
            })
            .flatten_ok()
            .collect::<Result<Vec<_>>>()?
    );

    let transcript_digest = channel.digest();
    info!(
        "STARK proof over {} rows: {} FRI layers, {} openings",
        num_rows,
        fri_commitment.layers().len(),
        query_proofs.len()
    );

    Ok(StarkProof {
        public_inputs,
        trace_root,
        fri_layers: fri_commitment.into_layers(),
        query_proofs,
        transcript_digest,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::config::StarkConfig;
    use crate::square_fibonacci_stark::SquareFibonacciStark;

    fn small_context() -> Result<StarkContext> {
        StarkConfig {
            trace_length: 64,
            evaluation_domain_size: 256,
            blowup_factor: 4,
            fri_query_count: 8,
            ..StarkConfig::standard_config()
        }
        .build()
    }

    #[test]
    fn trace_lde_extends_the_trace() -> Result<()> {
        let ctx = small_context()?;
        let stark = SquareFibonacciStark::new(63);
        let (trace, _) = stark.generate_trace(&ctx.field, 1, 2);
        let lde = trace_lde(&ctx, &trace)?;
        assert_eq!(lde.len(), 256);
        let poly = PolynomialValues::new(&ctx.field, lde).coset_ifft(&ctx.shift)?;
        assert!(poly.degree() < 63);
        for (i, a) in trace.iter().enumerate() {
            assert_eq!(&poly.eval(&ctx.trace_point(i)), a);
        }
        Ok(())
    }

    #[test]
    fn proof_has_expected_shape() -> Result<()> {
        let ctx = small_context()?;
        let stark = SquareFibonacciStark::new(63);
        let (trace, public_inputs) = stark.generate_trace(&ctx.field, 1, 3141592);
        let proof = prove(&stark, &ctx, trace, public_inputs, &mut TimingTree::default())?;
        assert_eq!(proof.fri_layers.len(), 9);
        assert_eq!(proof.fri_layers[0].len(), 256);
        assert!(proof.fri_layers.last().is_some_and(|l| l.root.is_none()));
        assert_eq!(proof.openings_per_query(), 3 + 2 * 8 + 1);
        assert_eq!(proof.query_proofs.len(), 8 * proof.openings_per_query());
        assert_eq!(proof.transcript_digest.len(), 2 * ctx.hasher.hash_bytes(&[]).len());
        Ok(())
    }

    #[test]
    fn invalid_trace_is_refused() -> Result<()> {
        let ctx = small_context()?;
        let stark = SquareFibonacciStark::new(63);
        let (mut trace, public_inputs) = stark.generate_trace(&ctx.field, 1, 3141592);
        trace[20] = ctx.field.from_u64(42);
        let err = prove(&stark, &ctx, trace, public_inputs, &mut TimingTree::default())
            .unwrap_err();
        assert!(err.to_string().contains("Constraints are not satisfied"));
        Ok(())
    }

    #[test]
    fn wrong_public_inputs_are_refused() -> Result<()> {
        let ctx = small_context()?;
        let stark = SquareFibonacciStark::new(63);
        let (trace, mut public_inputs) = stark.generate_trace(&ctx.field, 1, 3141592);
        public_inputs[2] += ctx.field.one();
        let mut timing = TimingTree::default();
        assert!(prove(&stark, &ctx, trace.clone(), public_inputs, &mut timing).is_err());
        assert!(prove(&stark, &ctx, trace, vec![], &mut timing).is_err());
        Ok(())
    }
}
