use std::sync::Arc;

use anyhow::{anyhow, ensure, Result};
use log::debug;
use zkstark_field::{FieldElement, PrimeField};
use zkstark_util::{is_power_of_two, log2_strict};

use crate::fri::proof::{entries_per_query, FriLayer, FriProof, LayerId, QueryProof};
use crate::fri::{draw_query_indices, fold_pair, fri_domains, FriConfig};
use crate::hash::hashing::Hasher;
use crate::hash::merkle_proofs::verify_merkle_proof;
use crate::hash::merkle_tree::MerkleTree;
use crate::iop::channel::Channel;

/// Replays the commit phase on the verifier's channel: observe each root, draw each `beta`, then
/// observe the final value. Returns the folding challenges.
pub fn replay_commit_phase(
    layers: &[FriLayer],
    field: &PrimeField,
    channel: &mut Channel,
) -> Result<Vec<FieldElement>> {
    let (last, committed) = layers
        .split_last()
        .ok_or_else(|| anyhow!("FRI proof has no layers."))?;
    let mut betas = Vec::with_capacity(committed.len());
    for (k, layer) in committed.iter().enumerate() {
        let root = layer
            .root
            .as_ref()
            .ok_or_else(|| anyhow!("FRI layer {} has no commitment.", k))?;
        channel.send_digest(root);
        betas.push(channel.receive_random_field_element(field));
    }
    let final_value = last
        .values
        .first()
        .ok_or_else(|| anyhow!("FRI final layer is empty."))?;
    channel.send_field_element(final_value);
    Ok(betas)
}

/// Checks the shape of the layer sequence: it starts on `shift * <h>` of size `domain_size`,
/// halves by squaring down to one point, and every layer no larger than the blow-up factor is
/// constant and matches its commitment.
pub fn verify_layer_structure(
    config: &FriConfig,
    hasher: &Arc<dyn Hasher>,
    shift: &FieldElement,
    domain_size: usize,
    layers: &[FriLayer],
) -> Result<()> {
    ensure!(!layers.is_empty(), "FRI proof has no layers.");
    ensure!(
        is_power_of_two(domain_size),
        "FRI domain size {} is not a power of two.",
        domain_size
    );
    let domains = fri_domains(shift.field(), shift, log2_strict(domain_size))?;
    ensure!(
        layers.len() == domains.len(),
        "Expected {} FRI layers, got {}.",
        domains.len(),
        layers.len()
    );

    let last_index = layers.len() - 1;
    for (k, (layer, domain)) in layers.iter().zip(&domains).enumerate() {
        ensure!(
            layer.values.len() == layer.domain.len(),
            "FRI layer {} has {} values on {} points.",
            k,
            layer.values.len(),
            layer.domain.len()
        );
        ensure!(&layer.domain == domain, "FRI layer {} has the wrong domain.", k);
        if k == last_index {
            ensure!(layer.root.is_none(), "FRI final layer must not be committed.");
            continue;
        }
        let root = layer
            .root
            .as_ref()
            .ok_or_else(|| anyhow!("FRI layer {} has no commitment.", k))?;
        ensure!(!root.is_empty(), "FRI layer {} has an empty root.", k);

        if layer.len() <= config.blowup() {
            ensure!(
                layer.values.iter().all(|v| v == &layer.values[0]),
                "FRI layer {} of size {} is not constant.",
                k,
                layer.len()
            );
            let tree = MerkleTree::new(layer.values.clone(), hasher.clone())?;
            ensure!(
                tree.root() == root,
                "FRI layer {} does not match its commitment.",
                k
            );
        }
    }
    Ok(())
}

fn check_entry(
    hasher: &dyn Hasher,
    layers: &[FriLayer],
    entry: &QueryProof,
    k: usize,
    position: usize,
) -> Result<()> {
    let layer = &layers[k];
    ensure!(
        entry.layer == LayerId::Fri(k) && entry.index == Some(position),
        "FRI opening for layer {} is at the wrong position.",
        k
    );
    ensure!(
        layer.domain.get(position) == Some(&entry.point)
            && layer.values.get(position) == Some(&entry.value),
        "FRI opening for layer {} disagrees with the layer.",
        k
    );
    let root = layer
        .root
        .as_ref()
        .ok_or_else(|| anyhow!("FRI layer {} has no commitment.", k))?;
    verify_merkle_proof(
        root,
        &entry.value,
        &entry.path,
        position,
        layer.values.len(),
        hasher,
    )
}

/// Verifies the openings of one query against the committed layers: every Merkle path, and that
/// folding each opened pair with its `beta` gives the value opened in the next layer.
pub fn verify_query(
    hasher: &dyn Hasher,
    layers: &[FriLayer],
    betas: &[FieldElement],
    index: usize,
    entries: &[QueryProof],
) -> Result<()> {
    ensure!(!layers.is_empty(), "FRI proof has no layers.");
    let committed = layers.len() - 1;
    ensure!(
        betas.len() == committed,
        "Expected {} folding challenges, got {}.",
        committed,
        betas.len()
    );
    ensure!(
        entries.len() == entries_per_query(layers.len()),
        "Query {} has {} openings.",
        index,
        entries.len()
    );
    let last = &layers[committed];
    let (last_point, last_value) = last
        .domain
        .first()
        .zip(last.values.first())
        .ok_or_else(|| anyhow!("FRI final layer is empty."))?;
    let two_inv = last_point.field().two().inverse()?;

    let mut folded: Option<FieldElement> = None;
    for k in 0..committed {
        let n = layers[k].len();
        ensure!(n >= 2, "FRI layer {} is too small to fold.", k);
        let half = n / 2;
        let i = index % n;
        let j = (i + half) % n;
        let (e_i, e_j) = (&entries[2 * k], &entries[2 * k + 1]);
        check_entry(hasher, layers, e_i, k, i)?;
        check_entry(hasher, layers, e_j, k, j)?;
        if let Some(expected) = &folded {
            ensure!(
                &e_i.value == expected,
                "FRI folding check failed at layer {} for query {}.",
                k,
                index
            );
        }

        let (lo, hi) = if i < half { (e_i, e_j) } else { (e_j, e_i) };
        let two_x_inv = lo.point.double().inverse()?;
        folded = Some(fold_pair(
            &lo.value,
            &hi.value,
            &betas[k],
            &two_inv,
            &two_x_inv,
        ));
    }

    let final_entry = &entries[2 * committed];
    ensure!(
        final_entry.layer == LayerId::Fri(committed) && final_entry.index.is_none(),
        "Query {} does not end with the final value.",
        index
    );
    ensure!(
        &final_entry.point == last_point && &final_entry.value == last_value,
        "Query {} has the wrong final value.",
        index
    );
    if let Some(expected) = folded {
        ensure!(
            final_entry.value == expected,
            "FRI final folding check failed for query {}.",
            index
        );
    }
    Ok(())
}

/// Verifies a standalone FRI proof for a function on `shift * <h>`, `|<h>| = domain_size`,
/// replaying the prover's channel calls on `channel`.
pub fn verify_fri_proof(
    config: &FriConfig,
    hasher: &Arc<dyn Hasher>,
    shift: &FieldElement,
    domain_size: usize,
    proof: &FriProof,
    channel: &mut Channel,
) -> Result<()> {
    verify_layer_structure(config, hasher, shift, domain_size, &proof.layers)?;
    let betas = replay_commit_phase(&proof.layers, shift.field(), channel)?;
    let indices = draw_query_indices(channel, config.num_query_rounds, domain_size)?;
    debug!("FRI query indices {:?}", indices);

    let per_query = entries_per_query(proof.layers.len());
    ensure!(
        proof.query_proofs.len() == indices.len() * per_query,
        "Expected {} FRI openings, got {}.",
        indices.len() * per_query,
        proof.query_proofs.len()
    );
    for (&index, entries) in indices.iter().zip(proof.query_proofs.chunks(per_query)) {
        verify_query(hasher.as_ref(), &proof.layers, &betas, index, entries)?;
    }
    Ok(())
}
