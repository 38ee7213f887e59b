//! Bit-twiddling helpers for the buddy heap's size arithmetic.
//!
//! Block sizes are powers of two no larger than 2^28, so everything here
//! operates on 32-bit words.

/// Position table for the De Bruijn multiply-and-shift log2 below.
const DEBRUIJN_POSITION: [u32; 32] = [
  0, 1, 28, 2, 29, 14, 24, 3, 30, 22, 20, 15, 25, 17, 4, 8, 31, 27, 13, 23, 21, 19, 16, 7, 26, 12,
  18, 6, 11, 5, 10, 9,
];

/// A 32-bit De Bruijn sequence: multiplying a power of two by this constant
/// shifts a unique 5-bit pattern into the top bits.
const DEBRUIJN_SEQUENCE: u32 = 0x077C_B531;

/// Rounds `value` up to the next power of two.
///
/// Returns `value` unchanged when it already is one. The result wraps to 0
/// for inputs above 2^31; callers bound their inputs well below that.
pub fn ceil_pow2(mut value: u32) -> u32 {
  value = value.wrapping_sub(1);
  value |= value >> 1;
  value |= value >> 2;
  value |= value >> 4;
  value |= value >> 8;
  value |= value >> 16;
  value.wrapping_add(1)
}

/// Computes log2 of a power of two as a trailing-zeros count.
///
/// Uses the classic De Bruijn multiply-and-shift: the low set bit of `value`
/// selects a unique window of the sequence, which indexes the position
/// table. Only valid when `value` has exactly one set bit.
pub fn log2_pow2(value: u32) -> u32 {
  DEBRUIJN_POSITION[(value.wrapping_mul(DEBRUIJN_SEQUENCE) >> 27) as usize]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ceil_pow2_rounds_up() {
    assert_eq!(1, ceil_pow2(1));
    assert_eq!(2, ceil_pow2(2));
    assert_eq!(4, ceil_pow2(3));
    assert_eq!(64, ceil_pow2(33));
    assert_eq!(64, ceil_pow2(64));
    assert_eq!(128, ceil_pow2(65));
    assert_eq!(1 << 28, ceil_pow2((1 << 28) - 1));
  }

  #[test]
  fn ceil_pow2_is_identity_on_powers_of_two() {
    for shift in 0..31 {
      assert_eq!(1 << shift, ceil_pow2(1 << shift));
    }
  }

  #[test]
  fn log2_matches_every_bit_position() {
    for shift in 0..32 {
      assert_eq!(shift, log2_pow2(1 << shift));
    }
  }

  #[test]
  fn log2_of_rounded_sizes() {
    assert_eq!(6, log2_pow2(ceil_pow2(33)));
    assert_eq!(8, log2_pow2(ceil_pow2(223)));
    assert_eq!(10, log2_pow2(ceil_pow2(623)));
  }
}
