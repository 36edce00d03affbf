use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use zkstark_field::FieldElement;
use zkstark_util::log2_ceil;

use crate::hash::hash_types::Digest;
use crate::hash::hashing::Hasher;

/// One step of an authentication path.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct ProofNode {
    pub sibling: Digest,
    /// Whether the sibling is the right child, i.e. the running node is the left one.
    pub is_right: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct MerkleProof {
    /// The sibling at each layer, starting from the leaves.
    pub siblings: Vec<ProofNode>,
}

impl MerkleProof {
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }
}

/// Recomputes the root from `leaf` and its authentication path and compares it with `root`.
///
/// The orientation recorded in each node must agree with the bits of `leaf_index`, so a path
/// cannot be replayed for a different position. `num_leaves` bounds the index: in a tree with an
/// odd level the duplicated node would otherwise authenticate a position past the last leaf.
pub fn verify(
    root: &Digest,
    leaf: &FieldElement,
    proof: &MerkleProof,
    leaf_index: usize,
    num_leaves: usize,
    hasher: &dyn Hasher,
) -> bool {
    if leaf_index >= num_leaves || proof.len() != log2_ceil(num_leaves) {
        return false;
    }
    let mut index = leaf_index;
    let mut current = hasher.hash_elements(std::slice::from_ref(leaf));
    for node in &proof.siblings {
        let is_left = index & 1 == 0;
        if node.is_right != is_left {
            return false;
        }
        current = if node.is_right {
            hasher.two_to_one(&current, &node.sibling)
        } else {
            hasher.two_to_one(&node.sibling, &current)
        };
        index >>= 1;
    }
    index == 0 && &current == root
}

/// Verifies that the given leaf is present at the given index in the Merkle tree with the given
/// root.
pub fn verify_merkle_proof(
    root: &Digest,
    leaf: &FieldElement,
    proof: &MerkleProof,
    leaf_index: usize,
    num_leaves: usize,
    hasher: &dyn Hasher,
) -> Result<()> {
    ensure!(
        leaf_index < num_leaves,
        "Leaf index {} out of range for {} leaves.",
        leaf_index,
        num_leaves
    );
    ensure!(
        verify(root, leaf, proof, leaf_index, num_leaves, hasher),
        "Invalid Merkle proof."
    );
    Ok(())
}
