use std::sync::Arc;

use anyhow::{anyhow, ensure, Result};
use zkstark_field::FieldElement;
use zkstark_maybe_rayon::*;

use crate::hash::hash_types::Digest;
use crate::hash::hashing::Hasher;
use crate::hash::merkle_proofs::{MerkleProof, ProofNode};

/// A binary Merkle tree over field elements. Every level is kept, so proofs are read off
/// directly. A level of odd length pairs its last node with itself.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// The data in the leaves of the Merkle tree.
    pub leaves: Vec<FieldElement>,

    /// `levels[0]` holds the leaf digests and the last level holds only the root.
    levels: Vec<Vec<Digest>>,

    hasher: Arc<dyn Hasher>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<FieldElement>, hasher: Arc<dyn Hasher>) -> Result<Self> {
        ensure!(!leaves.is_empty(), "Cannot build a Merkle tree without leaves.");

        let leaf_digests = leaves
            .par_iter()
            .map(|leaf| hasher.hash_elements(std::slice::from_ref(leaf)))
            .collect::<Vec<_>>();
        let mut levels = vec![leaf_digests];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next = level
                .par_chunks(2)
                .map(|pair| match pair {
                    [left, right] => hasher.two_to_one(left, right),
                    [single] => hasher.two_to_one(single, single),
                    _ => unreachable!("chunks of two"),
                })
                .collect::<Vec<_>>();
            levels.push(next);
        }

        Ok(Self {
            leaves,
            levels,
            hasher,
        })
    }

    pub fn root(&self) -> &Digest {
        // Construction guarantees at least one level ending in a single root.
        &self.levels[self.levels.len() - 1][0]
    }

    pub fn hasher(&self) -> &Arc<dyn Hasher> {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn height(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn get(&self, i: usize) -> Option<&FieldElement> {
        self.leaves.get(i)
    }

    /// Create a Merkle proof from a leaf index.
    pub fn prove(&self, leaf_index: usize) -> Result<MerkleProof> {
        ensure!(
            leaf_index < self.leaves.len(),
            "Leaf index {} out of range for {} leaves.",
            leaf_index,
            self.leaves.len()
        );
        let mut index = leaf_index;
        let siblings = self.levels[..self.height()]
            .iter()
            .map(|level| {
                let node = if index & 1 == 0 {
                    // A missing right sibling means the node was paired with itself.
                    let sibling = level.get(index + 1).unwrap_or(&level[index]);
                    ProofNode {
                        sibling: sibling.clone(),
                        is_right: true,
                    }
                } else {
                    ProofNode {
                        sibling: level[index - 1].clone(),
                        is_right: false,
                    }
                };
                index >>= 1;
                node
            })
            .collect();
        Ok(MerkleProof { siblings })
    }

    /// The leaf at `leaf_index` together with its proof.
    pub fn open(&self, leaf_index: usize) -> Result<(FieldElement, MerkleProof)> {
        let leaf = self
            .get(leaf_index)
            .cloned()
            .ok_or_else(|| anyhow!("Leaf index {} out of range.", leaf_index))?;
        Ok((leaf, self.prove(leaf_index)?))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use zkstark_field::PrimeField;

    use super::*;
    use crate::hash::keccak::KeccakHash;
    use crate::hash::merkle_proofs::{verify, verify_merkle_proof};
    use crate::hash::poseidon::PoseidonHash;
    use crate::hash::sha256::Sha256Hash;

    fn babybear() -> PrimeField {
        PrimeField::new(2013265921u64).unwrap()
    }

    fn hashers(field: &PrimeField) -> Result<Vec<Arc<dyn Hasher>>> {
        Ok(vec![
            Arc::new(Sha256Hash),
            Arc::new(KeccakHash),
            Arc::new(PoseidonHash::poseidon(field, 80)?),
        ])
    }

    #[test]
    fn test_merkle_trees() -> Result<()> {
        let field = babybear();
        let mut rng = ChaCha8Rng::seed_from_u64(60);
        for hasher in hashers(&field)? {
            for n in [1, 2, 5, 8, 13] {
                let leaves = field.rand_vec(n, &mut rng);
                let tree = MerkleTree::new(leaves.clone(), hasher.clone())?;
                for (i, leaf) in leaves.iter().enumerate() {
                    let proof = tree.prove(i)?;
                    assert_eq!(proof.len(), tree.height());
                    verify_merkle_proof(tree.root(), leaf, &proof, i, n, hasher.as_ref())?;
                }
            }
        }
        Ok(())
    }

    #[test]
    fn tampered_proofs_fail() -> Result<()> {
        let field = babybear();
        let mut rng = ChaCha8Rng::seed_from_u64(61);
        let hasher: Arc<dyn Hasher> = Arc::new(PoseidonHash::poseidon(&field, 80)?);
        let leaves = field.rand_vec(8, &mut rng);
        let tree = MerkleTree::new(leaves.clone(), hasher.clone())?;
        let proof = tree.prove(3)?;
        assert!(verify(tree.root(), &leaves[3], &proof, 3, 8, hasher.as_ref()));

        // Flipping any byte of any sibling breaks the proof.
        for layer in 0..proof.len() {
            for byte in 0..proof.siblings[layer].sibling.len() {
                let mut bad = proof.clone();
                bad.siblings[layer].sibling.0[byte] ^= 1;
                assert!(!verify(tree.root(), &leaves[3], &bad, 3, 8, hasher.as_ref()));
            }
        }
        assert!(!verify(tree.root(), &leaves[4], &proof, 3, 8, hasher.as_ref()));
        assert!(!verify(tree.root(), &leaves[3], &proof, 2, 8, hasher.as_ref()));
        assert!(verify_merkle_proof(tree.root(), &leaves[3], &proof, 7, 8, hasher.as_ref()).is_err());
        Ok(())
    }

    #[test]
    fn odd_levels_duplicate_last_node() -> Result<()> {
        let field = babybear();
        let hasher: Arc<dyn Hasher> = Arc::new(Sha256Hash);
        let leaves = (1..=3).map(|i| field.from_u64(i)).collect::<Vec<_>>();
        let tree = MerkleTree::new(leaves.clone(), hasher.clone())?;

        let h = |x: &FieldElement| hasher.hash_elements(std::slice::from_ref(x));
        let left = hasher.two_to_one(&h(&leaves[0]), &h(&leaves[1]));
        let right = hasher.two_to_one(&h(&leaves[2]), &h(&leaves[2]));
        assert_eq!(tree.root(), &hasher.two_to_one(&left, &right));

        // The duplicated node must not authenticate the slot past the last leaf.
        let proof = tree.prove(2)?;
        assert!(verify(tree.root(), &leaves[2], &proof, 2, 3, hasher.as_ref()));
        let mut phantom = proof.clone();
        phantom.siblings[0].is_right = false;
        assert!(!verify(tree.root(), &leaves[2], &phantom, 3, 3, hasher.as_ref()));
        assert!(verify_merkle_proof(tree.root(), &leaves[2], &phantom, 3, 3, hasher.as_ref()).is_err());
        // Without the bound the same path would be accepted.
        assert!(verify(tree.root(), &leaves[2], &phantom, 3, 4, hasher.as_ref()));
        assert!(!verify(tree.root(), &leaves[2], &proof, 2, 5, hasher.as_ref()));

        assert!(MerkleTree::new(vec![], hasher).is_err());
        Ok(())
    }
}
