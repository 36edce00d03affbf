use keccak_hash::keccak;
use zkstark_field::FieldElement;

use crate::hash::hash_types::Digest;
use crate::hash::hashing::{elements_to_bytes, Hasher};

/// Keccak-256, the `general-purpose-b` hasher.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct KeccakHash;

impl Hasher for KeccakHash {
    fn name(&self) -> &'static str {
        "keccak256"
    }

    fn hash_bytes(&self, data: &[u8]) -> Digest {
        Digest(keccak(data).0.to_vec())
    }

    fn hash_elements(&self, elements: &[FieldElement]) -> Digest {
        self.hash_bytes(&elements_to_bytes(elements))
    }
}
