//! Pack and unpack over the first `len` lanes of two source registers.
//!
//! Both sources are full-width copies taken before the destination is
//! written, so a destination that aliases a source sees no partial update.
//! Lanes past the computed range are zero.

use crate::encoding::ShuffleOp;

/// Computes a full-width shuffle result.
#[must_use]
pub fn shuffle(op: ShuffleOp, a: &[i32], b: &[i32], len: usize, width: usize) -> Vec<i32> {
    match op {
        ShuffleOp::UnpackLo => unpack(a, b, len, 0, width),
        ShuffleOp::UnpackHi => unpack(a, b, len, len / 2, width),
        ShuffleOp::PackLo => pack(a, b, len, 0, width),
        ShuffleOp::PackHi => pack(a, b, len, 1, width),
    }
}

/// Interleaves `a[offset..]` and `b[offset..]`: `dst[2i] = a[offset + i]`,
/// `dst[2i + 1] = b[offset + i]`.
fn unpack(a: &[i32], b: &[i32], len: usize, offset: usize, width: usize) -> Vec<i32> {
    let mut dst = vec![0; width];
    for i in (0..len).step_by(2) {
        let src = offset + i / 2;
        if let (Some(slot), Some(value)) = (dst.get_mut(i), a.get(src)) {
            *slot = *value;
        }
        if let (Some(slot), Some(value)) = (dst.get_mut(i + 1), b.get(src)) {
            *slot = *value;
        }
    }
    dst
}

/// De-interleaves: the first half takes every other element of `a` starting
/// at `parity`, the second half the same elements of `b`.
fn pack(a: &[i32], b: &[i32], len: usize, parity: usize, width: usize) -> Vec<i32> {
    let mut dst = vec![0; width];
    let half = len / 2;
    for (j, i) in (0..len).step_by(2).enumerate() {
        if let (Some(slot), Some(value)) = (dst.get_mut(j), a.get(i + parity)) {
            *slot = *value;
        }
        if let (Some(slot), Some(value)) = (dst.get_mut(j + half), b.get(i + parity)) {
            *slot = *value;
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use proptest::collection::vec;
    use proptest::prelude::*;

    use super::shuffle;
    use crate::encoding::ShuffleOp;

    #[test]
    fn unpack_low_interleaves_leading_halves() {
        let a = [1, 2, 3, 4, 0, 0];
        let b = [5, 6, 7, 8, 0, 0];
        assert_eq!(
            shuffle(ShuffleOp::UnpackLo, &a, &b, 4, 6),
            vec![1, 5, 2, 6, 0, 0]
        );
        assert_eq!(
            shuffle(ShuffleOp::UnpackHi, &a, &b, 4, 6),
            vec![3, 7, 4, 8, 0, 0]
        );
    }

    #[test]
    fn pack_splits_even_and_odd_elements() {
        let a = [1, 5, 2, 6];
        let b = [3, 7, 4, 8];
        assert_eq!(shuffle(ShuffleOp::PackLo, &a, &b, 4, 4), vec![1, 2, 3, 4]);
        assert_eq!(shuffle(ShuffleOp::PackHi, &a, &b, 4, 4), vec![5, 6, 7, 8]);
    }

    proptest! {
        #[test]
        fn unpack_then_pack_restores_both_sources(
            a in vec(any::<i32>(), 16),
            b in vec(any::<i32>(), 16),
            half in 1_usize..=8,
        ) {
            let len = half * 2;
            let lo = shuffle(ShuffleOp::UnpackLo, &a, &b, len, 16);
            let hi = shuffle(ShuffleOp::UnpackHi, &a, &b, len, 16);
            let a_back = shuffle(ShuffleOp::PackLo, &lo, &hi, len, 16);
            let b_back = shuffle(ShuffleOp::PackHi, &lo, &hi, len, 16);
            prop_assert_eq!(&a_back[..len], &a[..len]);
            prop_assert_eq!(&b_back[..len], &b[..len]);
        }

        #[test]
        fn odd_lengths_stay_in_bounds(len in 0_usize..=9) {
            let a = [1; 8];
            let b = [2; 8];
            for op in [ShuffleOp::UnpackLo, ShuffleOp::UnpackHi, ShuffleOp::PackLo, ShuffleOp::PackHi] {
                prop_assert_eq!(shuffle(op, &a, &b, len, 8).len(), 8);
            }
        }
    }
}
