use serde::Serialize;
use zkstark_field::FieldElement;

use crate::hash::hash_types::Digest;
use crate::hash::merkle_proofs::MerkleProof;

/// One FRI layer: a function given by its values on a domain, and the Merkle root of those
/// values. The last layer has a single point and no root; its value is sent directly.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct FriLayer {
    pub domain: Vec<FieldElement>,
    pub values: Vec<FieldElement>,
    pub root: Option<Digest>,
}

impl FriLayer {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The committed object an opening refers to.
#[derive(Copy, Clone, Debug, Serialize, Eq, PartialEq)]
pub enum LayerId {
    /// The low-degree extension of an execution trace.
    Trace,
    /// FRI layer `k`.
    Fri(usize),
}

/// An opened position of a committed layer.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct QueryProof {
    pub layer: LayerId,
    /// `None` for a value sent in the clear rather than opened from a tree.
    pub index: Option<usize>,
    pub point: FieldElement,
    pub value: FieldElement,
    pub path: MerkleProof,
}

/// A standalone FRI proof: every layer, then for each query the opened pair at each committed
/// layer followed by the final value.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct FriProof {
    pub layers: Vec<FriLayer>,
    pub query_proofs: Vec<QueryProof>,
}

impl FriProof {
    /// The value of the final single-point layer.
    pub fn final_value(&self) -> Option<&FieldElement> {
        self.layers.last().and_then(|layer| layer.values.first())
    }
}

/// Number of query entries FRI contributes per query for a proof with `num_layers` layers.
pub fn entries_per_query(num_layers: usize) -> usize {
    2 * num_layers.saturating_sub(1) + 1
}
