use anyhow::{ensure, Result};
use log::debug;
use zkstark::field::FieldElement;
use zkstark::fri::proof::{LayerId, QueryProof};
use zkstark::fri::verifier::{verify_layer_structure, verify_query};
use zkstark::hash::merkle_proofs::verify_merkle_proof;
use zkstark::iop::channel::Channel;

use crate::config::StarkContext;
use crate::proof::{StarkProof, StarkProofChallenges, TRACE_OPENINGS_PER_QUERY};
use crate::stark::{EvaluationFrame, Stark};
use crate::vanishing_poly::eval_composition_at_point;

pub fn verify<S: Stark>(stark: &S, ctx: &StarkContext, proof: &StarkProof) -> Result<()> {
    validate_proof_shape(stark, ctx, proof)?;
    let mut channel = Channel::new(ctx.hasher.clone());
    let challenges = proof.get_challenges(stark, ctx, &mut channel)?;
    verify_with_challenges(stark, ctx, proof, &challenges)?;
    ensure!(
        channel.digest() == proof.transcript_digest,
        "Transcript digest mismatch."
    );
    Ok(())
}

/// Structural checks that need no randomness.
fn validate_proof_shape<S: Stark>(
    stark: &S,
    ctx: &StarkContext,
    proof: &StarkProof,
) -> Result<()> {
    ensure!(!proof.trace_root.is_empty(), "Empty trace commitment.");
    ensure!(
        proof.public_inputs.len() == S::PUBLIC_INPUTS,
        "Expected {} public inputs, got {}.",
        S::PUBLIC_INPUTS,
        proof.public_inputs.len()
    );
    ensure!(
        proof.public_inputs.iter().all(|x| x.field() == &ctx.field),
        "Public inputs must belong to the configured field."
    );
    let num_rows = stark.num_rows();
    ensure!(
        (EvaluationFrame::ROWS..ctx.trace_length()).contains(&num_rows),
        "Trace of {} rows does not fit a trace subgroup of size {}.",
        num_rows,
        ctx.trace_length()
    );
    verify_layer_structure(
        &ctx.fri_config,
        &ctx.hasher,
        &ctx.shift,
        ctx.lde_size(),
        &proof.fri_layers,
    )?;
    let expected = ctx.fri_config.num_query_rounds * proof.openings_per_query();
    ensure!(
        proof.query_proofs.len() == expected,
        "Expected {} openings, got {}.",
        expected,
        proof.query_proofs.len()
    );
    Ok(())
}

pub(crate) fn verify_with_challenges<S: Stark>(
    stark: &S,
    ctx: &StarkContext,
    proof: &StarkProof,
    challenges: &StarkProofChallenges,
) -> Result<()> {
    let StarkProofChallenges {
        alphas,
        fri_betas,
        fri_query_indices,
    } = challenges;
    debug!("query indices {:?}", fri_query_indices);
    let boundary = stark.boundary_constraints(&proof.public_inputs);

    for (&index, openings) in fri_query_indices
        .iter()
        .zip(proof.query_proofs.chunks(proof.openings_per_query()))
    {
        let (trace_openings, fri_openings) = openings.split_at(TRACE_OPENINGS_PER_QUERY);
        let vars = verify_trace_openings(ctx, proof, index, trace_openings)?;

        let x = &ctx.evaluation_domain[index];
        let composition = eval_composition_at_point(stark, ctx, x, &vars, &boundary, alphas)?;
        ensure!(
            fri_openings
                .first()
                .is_some_and(|first| first.index == Some(index) && first.value == composition),
            "Composition does not match the constraints at query {}.",
            index
        );

        verify_query(
            ctx.hasher.as_ref(),
            &proof.fri_layers,
            fri_betas,
            index,
            fri_openings,
        )?;
    }
    Ok(())
}

/// Checks the openings of `f(x)`, `f(g x)` and `f(g^2 x)` against the trace commitment.
fn verify_trace_openings(
    ctx: &StarkContext,
    proof: &StarkProof,
    index: usize,
    openings: &[QueryProof],
) -> Result<EvaluationFrame> {
    let size = ctx.lde_size();
    let step = ctx.blowup();
    for (row, opening) in openings.iter().enumerate() {
        let position = (index + row * step) % size;
        ensure!(
            opening.layer == LayerId::Trace && opening.index == Some(position),
            "Trace opening {} of query {} is at the wrong position.",
            row,
            index
        );
        ensure!(
            opening.point == ctx.evaluation_domain[position],
            "Trace opening {} of query {} is at the wrong point.",
            row,
            index
        );
        verify_merkle_proof(
            &proof.trace_root,
            &opening.value,
            &opening.path,
            position,
            size,
            ctx.hasher.as_ref(),
        )?;
    }
    let value = |row: usize| -> FieldElement { openings[row].value.clone() };
    Ok(EvaluationFrame::from_values(value(0), value(1), value(2)))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use zkstark::util::timing::TimingTree;

    use super::*;
    use crate::config::{HashChoice, StarkConfig};
    use crate::prover::prove;
    use crate::square_fibonacci_stark::SquareFibonacciStark;

    fn prove_small(
        hash_function: HashChoice,
    ) -> Result<(StarkContext, SquareFibonacciStark, StarkProof)> {
        let ctx = StarkConfig {
            trace_length: 64,
            evaluation_domain_size: 256,
            blowup_factor: 4,
            fri_query_count: 6,
            hash_function,
            ..StarkConfig::standard_config()
        }
        .build()?;
        let stark = SquareFibonacciStark::for_trace_length(ctx.trace_length());
        let (trace, public_inputs) = stark.generate_trace(&ctx.field, 1, 3141592);
        let proof = prove(&stark, &ctx, trace, public_inputs, &mut TimingTree::default())?;
        Ok((ctx, stark, proof))
    }

    #[test]
    fn valid_with_every_hash() -> Result<()> {
        for choice in [
            HashChoice::Sha256,
            HashChoice::Keccak256,
            HashChoice::Poseidon,
            HashChoice::Poseidon2,
        ] {
            let (ctx, stark, proof) = prove_small(choice)?;
            verify(&stark, &ctx, &proof)?;
        }
        Ok(())
    }

    #[test]
    fn tampered_proofs_are_rejected() -> Result<()> {
        let (ctx, stark, proof) = prove_small(HashChoice::Poseidon)?;
        let one = ctx.field.one();

        let mut bad = proof.clone();
        bad.public_inputs[2] += &one;
        assert!(verify(&stark, &ctx, &bad).is_err());

        let mut bad = proof.clone();
        bad.trace_root.0[0] ^= 0x80;
        assert!(verify(&stark, &ctx, &bad).is_err());

        let mut bad = proof.clone();
        bad.trace_root.0.clear();
        assert!(verify(&stark, &ctx, &bad).is_err());

        // A trace opening that does not match the commitment.
        let mut bad = proof.clone();
        bad.query_proofs[1].value += &one;
        assert!(verify(&stark, &ctx, &bad).is_err());

        // The first FRI opening must equal the composition recomputed from the trace.
        let mut bad = proof.clone();
        bad.query_proofs[TRACE_OPENINGS_PER_QUERY].value += &one;
        assert!(verify(&stark, &ctx, &bad).is_err());

        let mut bad = proof.clone();
        bad.fri_layers.pop();
        assert!(verify(&stark, &ctx, &bad).is_err());

        let mut bad = proof.clone();
        bad.query_proofs.truncate(proof.openings_per_query());
        assert!(verify(&stark, &ctx, &bad).is_err());

        let mut bad = proof.clone();
        bad.transcript_digest = "00".repeat(16);
        assert!(verify(&stark, &ctx, &bad).is_err());
        Ok(())
    }

    #[test]
    fn proof_is_bound_to_the_configuration() -> Result<()> {
        let (ctx, stark, proof) = prove_small(HashChoice::Poseidon)?;
        let other = StarkConfig {
            fri_query_count: 7,
            ..ctx.config.clone()
        }
        .build()?;
        assert!(verify(&stark, &other, &proof).is_err());
        Ok(())
    }

    #[test]
    fn query_indices_are_reproducible() -> Result<()> {
        let (ctx, stark, proof) = prove_small(HashChoice::Sha256)?;
        let indices = proof.fri_query_indices(&stark, &ctx)?;
        assert_eq!(indices.len(), 6);
        let per_query = proof.openings_per_query();
        for (i, &index) in indices.iter().enumerate() {
            assert_eq!(proof.query_proofs[i * per_query].index, Some(index));
        }
        Ok(())
    }
}
