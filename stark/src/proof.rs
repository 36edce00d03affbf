use serde::Serialize;
use zkstark::field::FieldElement;
use zkstark::fri::proof::{entries_per_query, FriLayer, QueryProof};
use zkstark::hash::hash_types::Digest;

/// Trace openings per query: `f(x)`, `f(g x)` and `f(g^2 x)`.
pub const TRACE_OPENINGS_PER_QUERY: usize = 3;

#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct StarkProof {
    pub public_inputs: Vec<FieldElement>,
    /// Merkle root of the LDE of the trace.
    pub trace_root: Digest,
    /// Every FRI layer of the composition, the last one of size one and uncommitted.
    pub fri_layers: Vec<FriLayer>,
    /// For each query, the trace openings followed by the FRI openings.
    pub query_proofs: Vec<QueryProof>,
    /// Hex digest of the channel state once the query indices are drawn.
    pub transcript_digest: String,
}

impl StarkProof {
    /// The value the composition folds down to.
    pub fn final_value(&self) -> Option<&FieldElement> {
        self.fri_layers.last().and_then(|layer| layer.values.first())
    }

    pub fn openings_per_query(&self) -> usize {
        TRACE_OPENINGS_PER_QUERY + entries_per_query(self.fri_layers.len())
    }
}

/// Randomness drawn from the channel while proving, in order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StarkProofChallenges {
    /// Weights of the constraints in the composition.
    pub alphas: Vec<FieldElement>,
    /// FRI folding challenges, one per committed layer.
    pub fri_betas: Vec<FieldElement>,
    /// Indices into the evaluation domain.
    pub fri_query_indices: Vec<usize>,
}
