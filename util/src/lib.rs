//! Power-of-two and bit-reversal helpers shared by the field, hashing and STARK crates.

/// Computes `ceil(log_2(n))`.
#[must_use]
pub fn log2_ceil(n: usize) -> usize {
    (usize::BITS - n.saturating_sub(1).leading_zeros()) as usize
}

/// Computes `log_2(n)`, panicking if `n` is not a power of two.
pub fn log2_strict(n: usize) -> usize {
    let res = n.trailing_zeros();
    assert!(n.wrapping_shr(res) == 1, "Not a power of two: {}", n);
    res as usize
}

/// Whether `n` is a (non-zero) power of two.
pub const fn is_power_of_two(n: usize) -> bool {
    n != 0 && n & (n - 1) == 0
}

/// Reverses the lowest `bits` bits of `i`.
#[inline]
pub const fn reverse_bits(i: usize, bits: usize) -> usize {
    if bits == 0 {
        0
    } else {
        i.reverse_bits() >> (usize::BITS as usize - bits)
    }
}

/// Permutes `arr` in place so that each index is swapped with its bit reversal.
pub fn reverse_index_bits_in_place<T>(arr: &mut [T]) {
    let lb_n = log2_strict(arr.len());
    for src in 0..arr.len() {
        let dst = reverse_bits(src, lb_n);
        if src < dst {
            arr.swap(src, dst);
        }
    }
}
