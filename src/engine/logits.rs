//! Logit transform library: temperature, top-k, top-p, min-p.
//!
//! Each transform filters one score row in place by setting excluded
//! entries to `f32::NEG_INFINITY`. Entries are never removed, so the row
//! keeps its shape and downstream steps stay uniform across the
//! vocabulary. Enable/disable decisions belong to the caller; every
//! function here assumes its parameter is active and already validated.

use std::cmp::Ordering;

/// Divide every score by `t`.
///
/// `t == 1.0` is a no-op. Callers guarantee `t > 0`; a disabled
/// temperature means this function is not called at all.
pub fn temperature_scale(scores: &mut [f32], t: f32) {
    for s in scores.iter_mut() {
        *s /= t;
    }
}

/// Keep the `k` highest-scoring entries, mask the rest.
///
/// No-op when `k >= scores.len()`. Ties at the boundary are broken by
/// index order (stable sort), so the result is deterministic.
pub fn top_k_mask(scores: &mut [f32], k: usize) {
    if k >= scores.len() {
        return;
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });
    for &idx in &order[k..] {
        scores[idx] = f32::NEG_INFINITY;
    }
}

/// Nucleus filtering: keep the minimal high-probability prefix whose
/// cumulative probability reaches `p`, mask the remainder.
///
/// The highest-probability entry always survives, even when it alone
/// exceeds `p`. With `p` exactly equal to the top probability, exactly
/// one candidate survives.
pub fn top_p_mask(scores: &mut [f32], p: f32) {
    let probs = probabilities(scores);
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        probs[b]
            .partial_cmp(&probs[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut cumulative = 0.0f32;
    let mut cutoff = order.len();
    for (i, &idx) in order.iter().enumerate() {
        cumulative += probs[idx];
        if cumulative >= p {
            cutoff = i + 1;
            break;
        }
    }
    for &idx in &order[cutoff..] {
        scores[idx] = f32::NEG_INFINITY;
    }
}

/// Keep entries whose probability is at least `p` times the maximum
/// probability, mask the rest.
///
/// The arg-max entry always survives (its probability equals the
/// maximum, and `p <= 1`).
pub fn min_p_mask(scores: &mut [f32], p: f32) {
    let probs = probabilities(scores);
    let max_prob = probs.iter().copied().fold(0.0f32, f32::max);
    let threshold = p * max_prob;
    for (s, prob) in scores.iter_mut().zip(probs.iter()) {
        if *prob < threshold {
            *s = f32::NEG_INFINITY;
        }
    }
}

/// Softmax over one score row. `-inf` entries get probability 0.
///
/// Returns all zeros when every entry is `-inf` (the degenerate row the
/// sampler's fallback rule exists for).
pub fn probabilities(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return vec![0.0; scores.len()];
    }
    let mut out: Vec<f32> = scores
        .iter()
        .map(|&s| {
            if s == f32::NEG_INFINITY {
                0.0
            } else {
                (s - max).exp()
            }
        })
        .collect();
    let sum: f32 = out.iter().sum();
    for v in &mut out {
        *v /= sum;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masked_count(scores: &[f32]) -> usize {
        scores.iter().filter(|&&s| s == f32::NEG_INFINITY).count()
    }

    #[test]
    fn test_temperature_scale_divides() {
        let mut scores = vec![2.0, 4.0, -6.0];
        temperature_scale(&mut scores, 2.0);
        assert_eq!(scores, vec![1.0, 2.0, -3.0]);
    }

    #[test]
    fn test_temperature_one_is_noop() {
        let mut scores = vec![1.5, -0.5, 3.0];
        let original = scores.clone();
        temperature_scale(&mut scores, 1.0);
        assert_eq!(scores, original);
    }

    #[test]
    fn test_temperature_preserves_neg_infinity() {
        let mut scores = vec![f32::NEG_INFINITY, 1.0];
        temperature_scale(&mut scores, 0.5);
        assert_eq!(scores[0], f32::NEG_INFINITY);
        assert_eq!(scores[1], 2.0);
    }

    #[test]
    fn test_top_k_keeps_highest() {
        let mut scores = vec![1.0, 5.0, 3.0, 2.0];
        top_k_mask(&mut scores, 2);
        assert_eq!(scores[1], 5.0);
        assert_eq!(scores[2], 3.0);
        assert_eq!(scores[0], f32::NEG_INFINITY);
        assert_eq!(scores[3], f32::NEG_INFINITY);
    }

    #[test]
    fn test_top_k_noop_when_k_covers_vocab() {
        let mut scores = vec![1.0, 2.0, 3.0];
        let original = scores.clone();
        top_k_mask(&mut scores, 3);
        assert_eq!(scores, original);
        top_k_mask(&mut scores, 10);
        assert_eq!(scores, original);
    }

    #[test]
    fn test_top_k_one_keeps_argmax_only() {
        let mut scores = vec![0.5, 9.0, 1.0, 2.0];
        top_k_mask(&mut scores, 1);
        assert_eq!(masked_count(&scores), 3);
        assert_eq!(scores[1], 9.0);
    }

    #[test]
    fn test_top_p_keeps_minimal_prefix() {
        // probs roughly [0.64, 0.24, 0.09, 0.03]; p=0.7 needs the top two.
        let mut scores = vec![3.0, 2.0, 1.0, 0.0];
        top_p_mask(&mut scores, 0.7);
        assert_eq!(scores[0], 3.0);
        assert_eq!(scores[1], 2.0);
        assert_eq!(scores[2], f32::NEG_INFINITY);
        assert_eq!(scores[3], f32::NEG_INFINITY);
    }

    #[test]
    fn test_top_p_always_keeps_top_entry() {
        // Top entry has ~1.0 probability, far above p=0.01.
        let mut scores = vec![100.0, 0.0, 0.0];
        top_p_mask(&mut scores, 0.01);
        assert_eq!(scores[0], 100.0);
        assert_eq!(masked_count(&scores), 2);
    }

    #[test]
    fn test_top_p_boundary_exactly_one_survivor() {
        // p equal to the top token's probability keeps exactly one.
        let scores = vec![2.0, 1.0, 0.0];
        let top_prob = probabilities(&scores)[0];
        let mut filtered = scores.clone();
        top_p_mask(&mut filtered, top_prob);
        assert_eq!(
            masked_count(&filtered),
            2,
            "expected exactly one survivor, got scores {:?}",
            filtered
        );
        assert_eq!(filtered[0], 2.0);
    }

    #[test]
    fn test_top_p_one_keeps_everything() {
        let mut scores = vec![1.0, 0.5, 0.0];
        let original = scores.clone();
        top_p_mask(&mut scores, 1.0);
        assert_eq!(scores, original);
    }

    #[test]
    fn test_min_p_masks_below_threshold() {
        // probs roughly [0.64, 0.24, 0.09, 0.03]; threshold 0.5*0.64=0.32
        // keeps only the top entry.
        let mut scores = vec![3.0, 2.0, 1.0, 0.0];
        min_p_mask(&mut scores, 0.5);
        assert_eq!(scores[0], 3.0);
        assert_eq!(masked_count(&scores), 3);
    }

    #[test]
    fn test_min_p_zero_keeps_everything() {
        let mut scores = vec![3.0, 2.0, 1.0];
        let original = scores.clone();
        min_p_mask(&mut scores, 0.0);
        assert_eq!(scores, original);
    }

    #[test]
    fn test_min_p_one_keeps_argmax() {
        let mut scores = vec![3.0, 2.0, 1.0];
        min_p_mask(&mut scores, 1.0);
        assert_eq!(scores[0], 3.0);
        assert_eq!(masked_count(&scores), 2);
    }

    #[test]
    fn test_min_p_uniform_keeps_everything() {
        // All probabilities equal the max, so nothing falls below any
        // threshold <= 1.
        let mut scores = vec![1.0; 5];
        min_p_mask(&mut scores, 0.9);
        assert_eq!(masked_count(&scores), 0);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let probs = probabilities(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "probabilities sum to {}", sum);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_probabilities_neg_infinity_is_zero() {
        let probs = probabilities(&[1.0, f32::NEG_INFINITY, 1.0]);
        assert_eq!(probs[1], 0.0);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_probabilities_all_masked() {
        let probs = probabilities(&[f32::NEG_INFINITY; 4]);
        assert_eq!(probs, vec![0.0; 4]);
    }

    #[test]
    fn test_transforms_preserve_shape() {
        let mut scores = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        top_k_mask(&mut scores, 2);
        top_p_mask(&mut scores, 0.5);
        min_p_mask(&mut scores, 0.5);
        assert_eq!(scores.len(), 5);
    }
}
