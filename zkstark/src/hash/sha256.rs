use sha2::{Digest as _, Sha256};
use zkstark_field::FieldElement;

use crate::hash::hash_types::Digest;
use crate::hash::hashing::{elements_to_bytes, Hasher};

/// SHA-256, the `general-purpose-a` hasher. Field elements are hashed through their canonical
/// little-endian encoding.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Sha256Hash;

impl Hasher for Sha256Hash {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn hash_bytes(&self, data: &[u8]) -> Digest {
        Digest(Sha256::digest(data).to_vec())
    }

    fn hash_elements(&self, elements: &[FieldElement]) -> Digest {
        self.hash_bytes(&elements_to_bytes(elements))
    }
}
