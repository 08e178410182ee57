//! Skin weight quantization
//!
//! The file stores per-vertex blend weights as four bytes that must sum to
//! exactly 255. Quantization keeps influences in scene-iteration order (not
//! sorted by weight) and parks the rounding remainder on the largest slot.

use serde::{Deserialize, Serialize};

/// Maximum number of bone influences one vertex can carry.
pub const MAX_INFLUENCES: usize = 4;

/// The byte weights written for a vertex with no valid influence: full
/// weight on bone 0, parked in slot 2.
pub const FALLBACK_WEIGHTS: [u32; 4] = [0, 0, 255, 0];

/// One scene-side skinning influence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    /// Bone list position.
    pub bone: u32,
    /// Fractional weight in (0, 1].
    pub weight: f32,
}

/// Quantizes a vertex's influence list to the file's byte encoding.
///
/// Influences whose rounded byte value is 0 or whose bone does not resolve
/// within `bone_count` are discarded; the first four survivors are kept in
/// input order. The slot holding the single largest byte absorbs
/// `255 - sum` so the slots always total exactly 255. With no survivors the
/// fallback encoding binds everything to bone 0.
#[must_use]
pub fn quantize_weights(influences: &[Influence], bone_count: usize) -> ([u32; 4], [u32; 4]) {
    let mut weights = [0u32; 4];
    let mut indices = [0u32; 4];
    let mut kept = 0usize;
    let mut total = 0i64;
    let mut max_value = 0u32;
    let mut max_slot = None;

    for influence in influences {
        if kept == MAX_INFLUENCES {
            break;
        }
        let byte = (influence.weight * 255.0).round() as i64;
        if byte <= 0 || influence.bone as usize >= bone_count {
            continue;
        }
        let byte = byte.min(255) as u32;
        weights[kept] = byte;
        indices[kept] = influence.bone;
        if byte > max_value {
            max_value = byte;
            max_slot = Some(kept);
        }
        total += i64::from(byte);
        kept += 1;
    }

    if kept == 0 {
        return (FALLBACK_WEIGHTS, [0; 4]);
    }

    if let Some(slot) = max_slot {
        let adjusted = i64::from(weights[slot]) + (255 - total);
        weights[slot] = adjusted.clamp(0, 255) as u32;
    }

    (weights, indices)
}

/// Rebuilds a scene-side influence list from decoded fractional weights,
/// skipping empty slots.
#[must_use]
pub fn influences_from_vertex(weights: &[f32; 4], indices: &[u32; 4]) -> Vec<Influence> {
    weights
        .iter()
        .zip(indices)
        .filter(|(w, _)| **w > 0.0)
        .map(|(w, i)| Influence {
            bone: *i,
            weight: *w,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn influence(bone: u32, weight: f32) -> Influence {
        Influence { bone, weight }
    }

    #[test]
    fn test_weights_sum_to_255() {
        let influences = [
            influence(0, 0.3),
            influence(1, 0.3),
            influence(2, 0.4),
        ];
        let (weights, indices) = quantize_weights(&influences, 4);
        assert_eq!(weights.iter().sum::<u32>(), 255);
        assert_eq!(indices, [0, 1, 2, 0]);
    }

    #[test]
    fn test_remainder_goes_to_largest_slot() {
        // 0.5 * 255 = 127.5 -> 128 each; total 256, largest (first max) drops one
        let influences = [influence(0, 0.5), influence(1, 0.5)];
        let (weights, _) = quantize_weights(&influences, 2);
        assert_eq!(weights, [127, 128, 0, 0]);
        assert_eq!(weights.iter().sum::<u32>(), 255);
    }

    #[test]
    fn test_order_preserved_not_sorted() {
        let influences = [influence(5, 0.1), influence(2, 0.9)];
        let (weights, indices) = quantize_weights(&influences, 8);
        // Scene-iteration order is kept; the heavier influence stays second.
        assert_eq!(indices[0], 5);
        assert_eq!(indices[1], 2);
        assert!(weights[1] > weights[0]);
    }

    #[test]
    fn test_zero_and_invalid_influences_discarded() {
        let influences = [
            influence(0, 0.001), // rounds to byte 0
            influence(9, 0.5),   // bone out of range
            influence(1, 1.0),
        ];
        let (weights, indices) = quantize_weights(&influences, 4);
        assert_eq!(weights, [255, 0, 0, 0]);
        assert_eq!(indices, [1, 0, 0, 0]);
    }

    #[test]
    fn test_first_four_survivors_kept() {
        let influences = [
            influence(0, 0.2),
            influence(1, 0.2),
            influence(2, 0.2),
            influence(3, 0.2),
            influence(4, 0.2),
        ];
        let (weights, indices) = quantize_weights(&influences, 8);
        assert_eq!(indices, [0, 1, 2, 3]);
        assert_eq!(weights.iter().sum::<u32>(), 255);
    }

    #[test]
    fn test_degenerate_fallback() {
        let (weights, indices) = quantize_weights(&[], 4);
        assert_eq!(weights, [0, 0, 255, 0]);
        assert_eq!(indices, [0, 0, 0, 0]);

        let (weights, indices) = quantize_weights(&[influence(0, 0.001)], 4);
        assert_eq!(weights, [0, 0, 255, 0]);
        assert_eq!(indices, [0, 0, 0, 0]);
    }

    #[test]
    fn test_influences_from_vertex_skips_zero_slots() {
        let influences = influences_from_vertex(&[0.5, 0.0, 0.5, 0.0], &[3, 0, 7, 0]);
        assert_eq!(
            influences,
            vec![influence(3, 0.5), influence(7, 0.5)]
        );
    }
}
