//! Channel-vector / bitmask conversion.
//!
//! Enable-style settings live in two representations: a per-channel vector
//! of optional booleans on the configuration side, and a single 32-bit mask
//! register on the hardware side. Devices that cluster channels into groups
//! expose one mask bit per *group*, so the conversion folds `group_size`
//! consecutive channels onto one bit.
//!
//! Folding with `group_size = 1` is lossless:
//! [`mask_to_vec`]`(Some(`[`vec_to_mask`]`(v, 1, 1)), v, 1)` reproduces the
//! boolean pattern, with entries that were absent normalized to
//! `Some(false)`. Folding with `group_size > 1` collapses each group to one
//! bit and is lossy by design; the programming engine compares against the
//! lossless mask and warns when the two disagree.

/// Converts a vector of optional booleans into a bit mask.
///
/// For every entry that is `Some(true)` at `index`, a contiguous block of
/// `block_size` set bits is OR-ed in at bit position
/// `index / (group_size * block_size)`. Absent and `Some(false)` entries
/// contribute nothing, as do entries whose bit position falls beyond the
/// 32-bit register width (the same bound [`mask_to_vec`] applies when
/// expanding).
///
/// `group_size` is the number of consecutive channels represented by one
/// mask bit (`1` for ungrouped devices). `block_size` widens the pattern
/// written per channel and is used to build the lossless reference mask the
/// group mask is checked against. Note that the block pattern is placed at
/// the block *index*, not scaled back to the channel position, so the
/// reference comparison flags any set channel outside the first block even
/// when its whole block is uniformly enabled.
///
/// # Example
///
/// ```
/// use digconf::mask::vec_to_mask;
///
/// let v = vec![Some(true), Some(true), Some(false), None];
/// assert_eq!(vec_to_mask(&v, 1, 1), 0b0011);
/// // two channels per group: both set channels fall into group 0
/// assert_eq!(vec_to_mask(&v, 2, 1), 0b0001);
/// ```
pub fn vec_to_mask(values: &[Option<bool>], group_size: u32, block_size: u32) -> u32 {
    let block = match 1u32.checked_shl(block_size) {
        Some(b) => b - 1,
        None => u32::MAX,
    };
    let mut mask = 0u32;
    for (index, value) in values.iter().enumerate() {
        if *value == Some(true) {
            let bit = index as u32 / (group_size * block_size);
            if bit < 32 {
                mask |= block << bit;
            }
        }
    }
    mask
}

/// Expands a bit mask back into a vector of optional booleans.
///
/// An absent mask (a failed hardware read) sets every entry to `None`.
/// Otherwise entry `i` becomes `Some(bit(i / group_size))`.
///
/// # Example
///
/// ```
/// use digconf::mask::mask_to_vec;
///
/// let mut v = vec![None; 4];
/// mask_to_vec(Some(0b0101), &mut v, 1);
/// assert_eq!(v, vec![Some(true), Some(false), Some(true), Some(false)]);
///
/// mask_to_vec(None, &mut v, 1);
/// assert_eq!(v, vec![None; 4]);
/// ```
pub fn mask_to_vec(mask: Option<u32>, values: &mut [Option<bool>], group_size: u32) {
    let Some(mask) = mask else {
        for value in values.iter_mut() {
            *value = None;
        }
        return;
    };
    for (index, value) in values.iter_mut().enumerate() {
        let bit = index as u32 / group_size;
        *value = Some(bit < 32 && (mask >> bit) & 1 != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ungrouped_round_trip() {
        let v = vec![Some(true), Some(false), None, Some(true)];
        let mask = vec_to_mask(&v, 1, 1);
        assert_eq!(mask, 0b1001);
        let mut out = vec![None; 4];
        mask_to_vec(Some(mask), &mut out, 1);
        // absent entries normalize to Some(false)
        assert_eq!(
            out,
            vec![Some(true), Some(false), Some(false), Some(true)]
        );
    }

    #[test]
    fn test_absent_mask_clears_vector() {
        let mut v = vec![Some(true), Some(false)];
        mask_to_vec(None, &mut v, 1);
        assert_eq!(v, vec![None, None]);
    }

    #[test]
    fn test_group_folding() {
        // 4 channels, 2 per group: group 0 enabled, group 1 not
        let v = vec![Some(true), Some(true), Some(false), Some(false)];
        assert_eq!(vec_to_mask(&v, 2, 1), 0b01);
        let mut out = vec![None; 4];
        mask_to_vec(Some(0b01), &mut out, 2);
        assert_eq!(out, v);
    }

    #[test]
    fn test_group_mask_consistency_check() {
        // uniform groups: block mask and per-channel mask agree
        let uniform = vec![Some(true), Some(true), Some(false), Some(false)];
        assert_eq!(vec_to_mask(&uniform, 1, 2), vec_to_mask(&uniform, 1, 1));

        // split group: the masks disagree, which is what the engine warns on
        let split = vec![Some(true), Some(false), Some(false), Some(false)];
        assert_ne!(vec_to_mask(&split, 1, 2), vec_to_mask(&split, 1, 1));
    }

    #[test]
    fn test_false_contributes_nothing() {
        let v = vec![Some(false), None, Some(false)];
        assert_eq!(vec_to_mask(&v, 1, 1), 0);
    }

    #[test]
    fn test_bits_beyond_register_width_dropped() {
        // 64 channels ungrouped: channels past bit 31 cannot be
        // represented in the register and must not panic
        let mut v = vec![None; 64];
        v[0] = Some(true);
        v[32] = Some(true);
        v[63] = Some(true);
        assert_eq!(vec_to_mask(&v, 1, 1), 0b1);

        // folded onto 8 groups the same channels stay in range
        assert_eq!(vec_to_mask(&v, 8, 1), 0b1001_0001);
    }

    #[test]
    fn test_oversized_block_saturates() {
        let v = vec![Some(true)];
        assert_eq!(vec_to_mask(&v, 1, 32), u32::MAX);
    }

    #[test]
    fn test_block_reference_uses_block_index() {
        // the reference pattern is placed at the block index, so even a
        // uniformly enabled second group disagrees with the per-channel
        // mask; the engine's warning is pessimistic for this shape
        let v = vec![Some(false), Some(false), Some(true), Some(true)];
        assert_eq!(vec_to_mask(&v, 1, 2), 0b110);
        assert_eq!(vec_to_mask(&v, 1, 1), 0b1100);
    }
}
