use std::sync::Arc;

use anyhow::{ensure, Result};
use log::trace;
use num::{BigUint, ToPrimitive};
use serde::Serialize;
use zkstark_field::{FieldElement, PrimeField};

use crate::hash::hash_types::Digest;
use crate::hash::hashing::Hasher;

/// One logged channel event.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub enum TranscriptEntry {
    Sent(Digest),
    RandomInt(u64),
    RandomFieldElement(FieldElement),
}

/// Observes prover messages, and generates challenges by hashing the transcript, a la Fiat-Shamir.
///
/// The state is a running digest: sending `m` sets it to `H(state || m)`, and every challenge is
/// read from the current state before advancing it to `H(state)`. Prover and verifier must issue
/// the same calls in the same order to see the same challenges.
#[derive(Clone, Debug)]
pub struct Channel {
    hasher: Arc<dyn Hasher>,
    state: Digest,
    transcript: Vec<TranscriptEntry>,
}

impl Channel {
    pub fn new(hasher: Arc<dyn Hasher>) -> Self {
        let state = hasher.hash_bytes(&[]);
        Self {
            hasher,
            state,
            transcript: Vec::new(),
        }
    }

    pub fn hasher(&self) -> &Arc<dyn Hasher> {
        &self.hasher
    }

    pub fn send(&mut self, data: &[u8]) {
        let mut buffer = Vec::with_capacity(self.state.len() + data.len());
        buffer.extend_from_slice(self.state.as_bytes());
        buffer.extend_from_slice(data);
        self.state = self.hasher.hash_bytes(&buffer);
        self.transcript.push(TranscriptEntry::Sent(Digest(data.to_vec())));
    }

    pub fn send_digest(&mut self, digest: &Digest) {
        self.send(digest.as_bytes());
    }

    pub fn send_field_element(&mut self, x: &FieldElement) {
        self.send(&x.to_bytes_le());
    }

    pub fn send_field_elements(&mut self, xs: &[FieldElement]) {
        for x in xs {
            self.send_field_element(x);
        }
    }

    fn state_as_integer(&self) -> BigUint {
        BigUint::from_bytes_be(self.state.as_bytes())
    }

    fn advance(&mut self) {
        self.state = self.hasher.hash_bytes(self.state.as_bytes());
    }

    /// A challenge in `[min, max]`.
    pub fn receive_random_int(&mut self, min: u64, max: u64) -> Result<u64> {
        ensure!(min <= max, "Empty challenge range [{}, {}].", min, max);
        let range = BigUint::from(max - min) + 1u32;
        let offset = (self.state_as_integer() % range).to_u64().unwrap_or_default();
        let value = min + offset;
        trace!("channel challenge int {}", value);
        self.transcript.push(TranscriptEntry::RandomInt(value));
        self.advance();
        Ok(value)
    }

    pub fn receive_random_field_element(&mut self, field: &PrimeField) -> FieldElement {
        let value = field.from_biguint(&self.state_as_integer());
        trace!("channel challenge element {}", value);
        self.transcript
            .push(TranscriptEntry::RandomFieldElement(value.clone()));
        self.advance();
        value
    }

    pub fn state(&self) -> &Digest {
        &self.state
    }

    /// The current state in hex, which commits to the whole transcript.
    pub fn digest(&self) -> String {
        self.state.to_hex()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::poseidon::PoseidonHash;
    use crate::hash::sha256::Sha256Hash;

    fn babybear() -> PrimeField {
        PrimeField::new(2013265921u64).unwrap()
    }

    #[test]
    fn replay_gives_same_challenges() -> Result<()> {
        let field = babybear();
        let hasher: Arc<dyn Hasher> = Arc::new(PoseidonHash::poseidon(&field, 80)?);
        let run = |hasher: Arc<dyn Hasher>| -> Result<(Vec<u64>, FieldElement, String)> {
            let mut channel = Channel::new(hasher);
            channel.send(b"commitment");
            let ints = (0..5)
                .map(|_| channel.receive_random_int(10, 20))
                .collect::<Result<Vec<_>>>()?;
            let x = channel.receive_random_field_element(&field);
            Ok((ints, x, channel.digest()))
        };
        let (ints, x, digest) = run(hasher.clone())?;
        assert_eq!(run(hasher)?, (ints.clone(), x, digest));
        assert!(ints.iter().all(|i| (10..=20).contains(i)));
        Ok(())
    }

    #[test]
    fn challenges_depend_on_messages() -> Result<()> {
        let field = babybear();
        let mut a = Channel::new(Arc::new(Sha256Hash));
        let mut b = Channel::new(Arc::new(Sha256Hash));
        a.send(b"a");
        b.send(b"b");
        assert_ne!(
            a.receive_random_field_element(&field),
            b.receive_random_field_element(&field)
        );
        assert_ne!(a.digest(), b.digest());
        Ok(())
    }

    #[test]
    fn transcript_logs_everything() -> Result<()> {
        let field = babybear();
        let mut channel = Channel::new(Arc::new(Sha256Hash));
        channel.send(&[1, 2, 3]);
        let i = channel.receive_random_int(0, 0)?;
        assert_eq!(i, 0);
        let x = channel.receive_random_field_element(&field);
        assert_eq!(
            channel.transcript(),
            &[
                TranscriptEntry::Sent(Digest(vec![1, 2, 3])),
                TranscriptEntry::RandomInt(0),
                TranscriptEntry::RandomFieldElement(x),
            ]
        );
        assert!(channel.receive_random_int(5, 4).is_err());
        Ok(())
    }
}
