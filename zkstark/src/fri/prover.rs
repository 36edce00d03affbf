use std::sync::Arc;

use anyhow::{anyhow, ensure, Result};
use itertools::Itertools;
use log::debug;
use zkstark_field::batch_util::batch_multiplicative_inverse;
use zkstark_field::FieldElement;
use zkstark_maybe_rayon::*;
use zkstark_util::is_power_of_two;

use crate::fri::proof::{FriLayer, FriProof, LayerId, QueryProof};
use crate::fri::{draw_query_indices, fold_pair, FriConfig};
use crate::hash::hashing::Hasher;
use crate::hash::merkle_proofs::MerkleProof;
use crate::hash::merkle_tree::MerkleTree;
use crate::iop::channel::Channel;

/// Folds one layer with challenge `beta`. `domain[i + n/2]` must equal `-domain[i]`.
pub fn fold_layer(
    domain: &[FieldElement],
    values: &[FieldElement],
    beta: &FieldElement,
) -> Result<(Vec<FieldElement>, Vec<FieldElement>)> {
    let n = values.len();
    ensure!(n == domain.len(), "Layer domain and values differ in length.");
    ensure!(n >= 2 && n % 2 == 0, "Cannot fold a layer of size {}.", n);
    let half = n / 2;
    let field = domain[0].field();

    let two_inv = field.two().inverse()?;
    let two_x = domain[..half].iter().map(|x| x.double()).collect_vec();
    let two_x_inv = batch_multiplicative_inverse(&two_x)?;

    let next_domain = domain[..half].par_iter().map(|x| x.square()).collect();
    let next_values = (0..half)
        .into_par_iter()
        .map(|i| fold_pair(&values[i], &values[i + half], beta, &two_inv, &two_x_inv[i]))
        .collect();
    Ok((next_domain, next_values))
}

/// The prover's side of the commit phase: every layer, the Merkle tree of each committed layer and
/// the folding challenges.
#[derive(Debug)]
pub struct FriCommitment {
    layers: Vec<FriLayer>,
    trees: Vec<MerkleTree>,
    betas: Vec<FieldElement>,
}

impl FriCommitment {
    pub fn layers(&self) -> &[FriLayer] {
        &self.layers
    }

    pub fn into_layers(self) -> Vec<FriLayer> {
        self.layers
    }

    pub fn betas(&self) -> &[FieldElement] {
        &self.betas
    }

    pub fn final_value(&self) -> Option<&FieldElement> {
        self.layers.last().and_then(|layer| layer.values.first())
    }

    /// Opens query `index` of the first layer: at each committed layer `k` of size `n_k`, the
    /// positions `index mod n_k` and its partner `(index mod n_k) + n_k/2 mod n_k`, then the
    /// final value.
    pub fn open_query(&self, index: usize) -> Result<Vec<QueryProof>> {
        let mut openings = Vec::with_capacity(2 * self.trees.len() + 1);
        for (k, (layer, tree)) in self.layers.iter().zip(&self.trees).enumerate() {
            let n = layer.len();
            let i = index % n;
            for position in [i, (i + n / 2) % n] {
                let (value, path) = tree.open(position)?;
                openings.push(QueryProof {
                    layer: LayerId::Fri(k),
                    index: Some(position),
                    point: layer.domain[position].clone(),
                    value,
                    path,
                });
            }
        }

        let last = self
            .layers
            .last()
            .ok_or_else(|| anyhow!("FRI commitment has no layers."))?;
        let final_value = self
            .final_value()
            .ok_or_else(|| anyhow!("FRI final layer is empty."))?;
        openings.push(QueryProof {
            layer: LayerId::Fri(self.layers.len() - 1),
            index: None,
            point: last.domain[0].clone(),
            value: final_value.clone(),
            path: MerkleProof::default(),
        });
        Ok(openings)
    }
}

#[derive(Debug, Clone)]
pub struct FriProver {
    config: FriConfig,
    hasher: Arc<dyn Hasher>,
}

impl FriProver {
    pub fn new(config: FriConfig, hasher: Arc<dyn Hasher>) -> Self {
        Self { config, hasher }
    }

    pub fn config(&self) -> &FriConfig {
        &self.config
    }

    /// Runs the commit phase on `values` over `domain`: for each layer of size above one, commit,
    /// send the root, draw `beta` and fold. The final value is sent in the clear.
    pub fn commit(
        &self,
        domain: Vec<FieldElement>,
        values: Vec<FieldElement>,
        channel: &mut Channel,
    ) -> Result<FriCommitment> {
        ensure!(
            is_power_of_two(values.len()),
            "FRI domain size {} is not a power of two.",
            values.len()
        );
        ensure!(
            values.len() == domain.len(),
            "FRI domain and values differ in length."
        );
        let field = domain[0].field().clone();

        let mut layers = Vec::new();
        let mut trees = Vec::new();
        let mut betas = Vec::new();
        let (mut domain, mut values) = (domain, values);
        while values.len() > 1 {
            let tree = MerkleTree::new(values.clone(), self.hasher.clone())?;
            let root = tree.root().clone();
            debug!("FRI layer {} of size {}: root {}", layers.len(), values.len(), root);
            channel.send_digest(&root);
            let beta = channel.receive_random_field_element(&field);

            let (next_domain, next_values) = fold_layer(&domain, &values, &beta)?;
            layers.push(FriLayer {
                domain,
                values,
                root: Some(root),
            });
            trees.push(tree);
            betas.push(beta);
            domain = next_domain;
            values = next_values;
        }

        channel.send_field_element(&values[0]);
        layers.push(FriLayer {
            domain,
            values,
            root: None,
        });
        Ok(FriCommitment {
            layers,
            trees,
            betas,
        })
    }

    /// A complete standalone proof: commit phase, query draws, openings.
    pub fn prove(
        &self,
        domain: Vec<FieldElement>,
        values: Vec<FieldElement>,
        channel: &mut Channel,
    ) -> Result<FriProof> {
        let domain_size = values.len();
        let commitment = self.commit(domain, values, channel)?;
        let indices = draw_query_indices(channel, self.config.num_query_rounds, domain_size)?;
        let query_proofs = indices
            .iter()
            .map(|&i| commitment.open_query(i))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        Ok(FriProof {
            layers: commitment.into_layers(),
            query_proofs,
        })
    }
}

/// Proves that `values` on `domain` are close to a polynomial of degree below
/// `values.len() * rate`.
pub fn fri_proof(
    config: &FriConfig,
    hasher: Arc<dyn Hasher>,
    domain: Vec<FieldElement>,
    values: Vec<FieldElement>,
    channel: &mut Channel,
) -> Result<FriProof> {
    FriProver::new(config.clone(), hasher).prove(domain, values, channel)
}
