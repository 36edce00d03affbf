//! The hashing interface shared by every backend, and the sponge construction used by the
//! algebraic ones.

use std::fmt::Debug;

use zkstark_field::{FieldElement, PrimeField};

use crate::hash::hash_types::Digest;

/// A hash function usable for Merkle commitments and the Fiat-Shamir channel.
pub trait Hasher: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn hash_bytes(&self, data: &[u8]) -> Digest;

    fn hash_elements(&self, elements: &[FieldElement]) -> Digest;

    /// A one-way compression function combining two digests into one.
    fn two_to_one(&self, left: &Digest, right: &Digest) -> Digest {
        let mut buffer = Vec::with_capacity(left.len() + right.len());
        buffer.extend_from_slice(left.as_bytes());
        buffer.extend_from_slice(right.as_bytes());
        self.hash_bytes(&buffer)
    }
}

/// Canonical little-endian encoding of a sequence of field elements, for byte-oriented hashers.
pub fn elements_to_bytes(elements: &[FieldElement]) -> Vec<u8> {
    elements.iter().flat_map(|x| x.to_bytes_le()).collect()
}

/// The number of bytes packed into one field element: the largest count that always fits below
/// the modulus.
pub fn bytes_per_element(field: &PrimeField) -> usize {
    ((field.bits() - 1) / 8).max(1)
}

/// Packs bytes into field elements, little-endian within each chunk, and appends the byte length
/// so inputs differing only in trailing zeros stay distinct.
pub fn bytes_to_elements(field: &PrimeField, data: &[u8]) -> Vec<FieldElement> {
    let mut elements = data
        .chunks(bytes_per_element(field))
        .map(|chunk| field.from_bytes_le(chunk))
        .collect::<Vec<_>>();
    elements.push(field.from_usize(data.len()));
    elements
}

/// Splits a digest back into the field elements it encodes.
pub fn digest_to_elements(field: &PrimeField, digest: &Digest) -> Vec<FieldElement> {
    digest
        .as_bytes()
        .chunks(field.num_bytes())
        .map(|chunk| field.from_bytes_le(chunk))
        .collect()
}

/// A fixed-width permutation over field elements, usable in the sponge construction.
pub trait SpongePermutation: Debug + Send + Sync {
    fn field(&self) -> &PrimeField;

    /// The state width `t`.
    fn width(&self) -> usize;

    /// The number of state elements absorbed or squeezed per permutation.
    fn rate(&self) -> usize;

    fn capacity(&self) -> usize {
        self.width() - self.rate()
    }

    /// Applies the permutation to `state`, which must have `width()` elements.
    fn permute(&self, state: &mut [FieldElement]);
}

/// A duplex sponge over a [`SpongePermutation`].
///
/// Inputs are buffered and added into the rate part of the state `rate` elements at a time, one
/// permutation per block. Squeezing flushes pending inputs and emits `rate` elements per
/// permutation; absorbing again after a squeeze is allowed and discards unread outputs.
#[derive(Clone, Debug)]
pub struct Sponge<'a, P: SpongePermutation + ?Sized> {
    permutation: &'a P,
    state: Vec<FieldElement>,
    input_buffer: Vec<FieldElement>,
    output_buffer: Vec<FieldElement>,
}

impl<'a, P: SpongePermutation + ?Sized> Sponge<'a, P> {
    pub fn new(permutation: &'a P) -> Self {
        Self::with_domain(permutation, permutation.field().zero())
    }

    /// A sponge whose first capacity element starts at `domain` instead of zero.
    pub fn with_domain(permutation: &'a P, domain: FieldElement) -> Self {
        let field = permutation.field();
        let mut state = vec![field.zero(); permutation.width()];
        state[permutation.rate()] = domain;
        Self {
            permutation,
            state,
            input_buffer: Vec::new(),
            output_buffer: Vec::new(),
        }
    }

    pub fn absorb(&mut self, elements: &[FieldElement]) {
        // Any buffered outputs are now invalid, since they wouldn't reflect this input.
        self.output_buffer.clear();
        self.input_buffer.extend_from_slice(elements);
    }

    pub fn squeeze(&mut self) -> FieldElement {
        self.absorb_buffered_inputs();

        if self.output_buffer.is_empty() {
            self.permutation.permute(&mut self.state);
            self.fill_output_buffer();
        }
        // The buffer is refilled above whenever it runs empty, and `rate` is positive.
        self.output_buffer
            .pop()
            .unwrap_or_else(|| self.permutation.field().zero())
    }

    pub fn squeeze_n(&mut self, n: usize) -> Vec<FieldElement> {
        (0..n).map(|_| self.squeeze()).collect()
    }

    fn absorb_buffered_inputs(&mut self) {
        if self.input_buffer.is_empty() {
            return;
        }
        let rate = self.permutation.rate();
        let inputs = std::mem::take(&mut self.input_buffer);
        for chunk in inputs.chunks(rate) {
            for (s, x) in self.state.iter_mut().zip(chunk) {
                *s += x;
            }
            self.permutation.permute(&mut self.state);
        }
        self.fill_output_buffer();
    }

    /// Outputs are popped from the back, so store the rate part reversed.
    fn fill_output_buffer(&mut self) {
        let rate = self.permutation.rate();
        self.output_buffer = self.state[..rate].iter().rev().cloned().collect();
    }
}

/// Hashes `inputs` to `num_outputs` field elements. The sponge capacity is seeded with the input
/// length, and the empty input hashes to zeros.
pub fn hash_n_to_m<P: SpongePermutation + ?Sized>(
    permutation: &P,
    inputs: &[FieldElement],
    num_outputs: usize,
) -> Vec<FieldElement> {
    let field = permutation.field();
    if inputs.is_empty() {
        return vec![field.zero(); num_outputs];
    }
    let mut sponge = Sponge::with_domain(permutation, field.from_usize(inputs.len()));
    sponge.absorb(inputs);
    sponge.squeeze_n(num_outputs)
}

/// Hashes `inputs` to a single field element.
pub fn hash_n_to_one<P: SpongePermutation + ?Sized>(
    permutation: &P,
    inputs: &[FieldElement],
) -> FieldElement {
    let field = permutation.field();
    hash_n_to_m(permutation, inputs, 1)
        .pop()
        .unwrap_or_else(|| field.zero())
}

/// A [`Hasher`] backed by an algebraic permutation. A digest is one full squeeze of `rate`
/// elements in canonical byte encoding.
#[derive(Debug)]
pub struct AlgebraicHasher<P: SpongePermutation> {
    name: &'static str,
    permutation: P,
}

impl<P: SpongePermutation> AlgebraicHasher<P> {
    pub fn new(name: &'static str, permutation: P) -> Self {
        Self { name, permutation }
    }

    pub fn permutation(&self) -> &P {
        &self.permutation
    }

    pub fn field(&self) -> &PrimeField {
        self.permutation.field()
    }

    /// The single-element hash.
    pub fn hash(&self, inputs: &[FieldElement]) -> FieldElement {
        hash_n_to_one(&self.permutation, inputs)
    }

    pub fn digest_len(&self) -> usize {
        self.permutation.rate() * self.field().num_bytes()
    }
}

impl<P: SpongePermutation> Hasher for AlgebraicHasher<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn hash_bytes(&self, data: &[u8]) -> Digest {
        self.hash_elements(&bytes_to_elements(self.field(), data))
    }

    fn hash_elements(&self, elements: &[FieldElement]) -> Digest {
        let outputs = hash_n_to_m(&self.permutation, elements, self.permutation.rate());
        Digest(elements_to_bytes(&outputs))
    }

    fn two_to_one(&self, left: &Digest, right: &Digest) -> Digest {
        let mut inputs = digest_to_elements(self.field(), left);
        inputs.extend(digest_to_elements(self.field(), right));
        self.hash_elements(&inputs)
    }
}
