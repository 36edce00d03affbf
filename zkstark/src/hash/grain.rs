//! The Grain LFSR used to derive Poseidon round constants.

use num::BigUint;
use zkstark_field::{FieldElement, PrimeField};

const STATE_BITS: usize = 80;

/// Feedback taps: `b_{i+80} = b_{i+62} ^ b_{i+51} ^ b_{i+38} ^ b_{i+23} ^ b_{i+13} ^ b_i`.
const TAPS: [usize; 6] = [62, 51, 38, 23, 13, 0];

/// Number of raw output bits discarded after seeding.
const WARMUP_BITS: usize = 160;

/// An 80-bit Grain-type LFSR seeded from a Poseidon parameter tuple.
///
/// Iterating yields the filtered bit stream: raw bits are consumed in pairs, and a pair
/// contributes its second bit only when its first bit is set.
#[derive(Clone, Debug)]
pub struct GrainLfsr {
    state: [bool; STATE_BITS],
    /// Index of the oldest bit `b_i`.
    head: usize,
}

impl GrainLfsr {
    /// Seeds the register with, from the most significant end: the field type (2 bits, `1` for a
    /// prime field), the S-box exponent (4 bits), the field size in bits (12 bits), the width
    /// (12 bits), the full round count (10 bits), the partial round count (10 bits), and 30 ones.
    pub fn new(
        alpha: u64,
        field_bits: usize,
        width: usize,
        full_rounds: usize,
        partial_rounds: usize,
    ) -> Self {
        let state = seed_bits(alpha, field_bits, width, full_rounds, partial_rounds);
        let mut lfsr = Self { state, head: 0 };
        for _ in 0..WARMUP_BITS {
            lfsr.next_raw_bit();
        }
        lfsr
    }

    fn next_raw_bit(&mut self) -> bool {
        let new_bit = TAPS
            .iter()
            .fold(false, |acc, &t| acc ^ self.state[(self.head + t) % STATE_BITS]);
        self.state[self.head] = new_bit;
        self.head = (self.head + 1) % STATE_BITS;
        new_bit
    }

    fn next_filtered_bit(&mut self) -> bool {
        loop {
            let first = self.next_raw_bit();
            let second = self.next_raw_bit();
            if first {
                return second;
            }
        }
    }

    /// Samples a field element: `bits(p)` filtered bits read big-endian, redrawn while the value
    /// is not below `p`.
    pub fn next_field_element(&mut self, field: &PrimeField) -> FieldElement {
        loop {
            let mut value = BigUint::default();
            for _ in 0..field.bits() {
                value <<= 1u32;
                if self.next_filtered_bit() {
                    value |= BigUint::from(1u32);
                }
            }
            if &value < field.modulus() {
                return field.from_biguint(&value);
            }
        }
    }

    pub fn next_field_elements(&mut self, field: &PrimeField, n: usize) -> Vec<FieldElement> {
        (0..n).map(|_| self.next_field_element(field)).collect()
    }
}

fn seed_bits(
    alpha: u64,
    field_bits: usize,
    width: usize,
    full_rounds: usize,
    partial_rounds: usize,
) -> [bool; STATE_BITS] {
    let mut state = [true; STATE_BITS];
    let mut pos = 0;
    let fields = [
        (1u64, 2),
        (alpha & 0xf, 4),
        (field_bits as u64, 12),
        (width as u64, 12),
        (full_rounds as u64, 10),
        (partial_rounds as u64, 10),
    ];
    for (value, len) in fields {
        for i in (0..len).rev() {
            state[pos] = (value >> i) & 1 == 1;
            pos += 1;
        }
    }
    state
}

impl Iterator for GrainLfsr {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        Some(self.next_filtered_bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_layout() {
        let seed = seed_bits(7, 31, 8, 8, 22);
        assert_eq!(&seed[..2], &[false, true]);
        assert_eq!(&seed[2..6], &[false, true, true, true]);
        // 31 in 12 bits.
        assert_eq!(
            &seed[6..18],
            &[false, false, false, false, false, false, false, true, true, true, true, true]
        );
        assert!(seed[50..].iter().all(|&b| b));
    }

    #[test]
    fn deterministic_and_parameter_sensitive() {
        let field = PrimeField::new(2013265921u64).unwrap();
        let a = GrainLfsr::new(7, 31, 8, 8, 22).next_field_elements(&field, 16);
        let b = GrainLfsr::new(7, 31, 8, 8, 22).next_field_elements(&field, 16);
        let c = GrainLfsr::new(7, 31, 8, 8, 23).next_field_elements(&field, 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|x| x.value() < *field.modulus()));
    }

    #[test]
    fn filtered_stream_is_balanced() {
        let ones = GrainLfsr::new(5, 64, 12, 8, 42)
            .take(4000)
            .filter(|&b| b)
            .count();
        assert!((1700..2300).contains(&ones), "{} ones", ones);
    }
}
