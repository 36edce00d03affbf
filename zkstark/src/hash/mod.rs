//! Hash functions over bytes and field elements, and the Merkle commitments built on them.

pub mod grain;
pub mod hash_types;
pub mod hashing;
pub mod keccak;
pub mod merkle_proofs;
pub mod merkle_tree;
pub mod poseidon;
pub mod poseidon2;
pub mod poseidon_params;
pub mod sha256;
