use anyhow::Result;
use zkstark::field::{FieldElement, PrimeField};
use zkstark::fri::draw_query_indices;
use zkstark::fri::verifier::replay_commit_phase;
use zkstark::iop::channel::Channel;

use crate::config::{StarkConfig, StarkContext};
use crate::proof::{StarkProof, StarkProofChallenges};
use crate::stark::Stark;

/// Binds the transcript to the instance: the configuration, then the public inputs.
pub(crate) fn observe_instance(
    channel: &mut Channel,
    config: &StarkConfig,
    public_inputs: &[FieldElement],
) {
    channel.send(&config.field_modulus.to_bytes_le());
    for parameter in [
        config.security_bits,
        config.trace_length,
        config.evaluation_domain_size,
        config.fri_query_count,
    ] {
        channel.send(&(parameter as u64).to_le_bytes());
    }
    channel.send(config.hash_function.name().as_bytes());
    channel.send_field_elements(public_inputs);
}

pub(crate) fn get_alphas(channel: &mut Channel, field: &PrimeField, n: usize) -> Vec<FieldElement> {
    (0..n)
        .map(|_| channel.receive_random_field_element(field))
        .collect()
}

impl StarkProof {
    /// Recomputes all Fiat-Shamir challenges of the proof by replaying the prover's messages on
    /// `channel`, which must be fresh.
    pub(crate) fn get_challenges<S: Stark>(
        &self,
        stark: &S,
        ctx: &StarkContext,
        channel: &mut Channel,
    ) -> Result<StarkProofChallenges> {
        observe_instance(channel, &ctx.config, &self.public_inputs);
        channel.send_digest(&self.trace_root);
        let alphas = get_alphas(
            channel,
            &ctx.field,
            stark.num_constraints(&self.public_inputs),
        );
        let fri_betas = replay_commit_phase(&self.fri_layers, &ctx.field, channel)?;
        let fri_query_indices = draw_query_indices(
            channel,
            ctx.fri_config.num_query_rounds,
            ctx.lde_size(),
        )?;
        Ok(StarkProofChallenges {
            alphas,
            fri_betas,
            fri_query_indices,
        })
    }

    /// The query indices the proof must answer.
    pub fn fri_query_indices<S: Stark>(&self, stark: &S, ctx: &StarkContext) -> Result<Vec<usize>> {
        let mut channel = Channel::new(ctx.hasher.clone());
        Ok(self
            .get_challenges(stark, ctx, &mut channel)?
            .fri_query_indices)
    }
}
