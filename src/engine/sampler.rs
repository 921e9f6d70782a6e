//! Token selection: greedy arg-max or the stochastic sampling pipeline.
//!
//! The pipeline order is fixed: temperature, then min-p, then top-k,
//! then top-p. Min-p runs on the temperature-scaled distribution before
//! the other two narrow it further. If filtering ever empties the
//! candidate set, the draw falls back to the temperature-scaled but
//! unfiltered distribution so a valid token always comes back.

use serde::{Deserialize, Serialize};

use crate::engine::logits::{min_p_mask, probabilities, temperature_scale, top_k_mask, top_p_mask};
use crate::rng::StreamKey;

/// Sampling knobs for one generation call. `None` disables a knob.
///
/// Immutable for the duration of a call. The seed is runtime-variable:
/// it feeds the stream key, not the sampling pipeline itself, and is
/// deliberately not part of the decode plan key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Draw stochastically when true; arg-max otherwise.
    pub do_sample: bool,
    /// Logit divisor, must be positive when set.
    pub temperature: Option<f32>,
    /// Keep only the k highest-scoring tokens, must be >= 1 when set.
    pub top_k: Option<usize>,
    /// Nucleus cutoff in (0, 1].
    pub top_p: Option<f32>,
    /// Relative probability floor in [0, 1].
    pub min_p: Option<f32>,
    /// Seed for the random stream; required when `do_sample` is true.
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            do_sample: false,
            temperature: None,
            top_k: None,
            top_p: None,
            min_p: None,
            seed: None,
        }
    }
}

/// Index of the maximum score. First index wins ties.
pub fn argmax(scores: &[f32]) -> u32 {
    let mut best_idx = 0u32;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in scores.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = i as u32;
        }
    }
    best_idx
}

/// Select one token from a score row.
///
/// Greedy mode (`do_sample == false`) returns the arg-max directly: no
/// transform runs and no randomness is consumed, so the result is
/// independent of every other knob. Sampling mode runs the transform
/// pipeline and draws categorically using the single uniform value at
/// `key`. Deterministic given the same scores, config, and key.
pub fn sample_token(scores: &[f32], config: &SamplingConfig, key: StreamKey) -> u32 {
    if !config.do_sample {
        return argmax(scores);
    }

    let mut scaled = scores.to_vec();
    if let Some(t) = config.temperature {
        temperature_scale(&mut scaled, t);
    }

    let mut filtered = scaled.clone();
    if let Some(p) = config.min_p {
        min_p_mask(&mut filtered, p);
    }
    if let Some(k) = config.top_k {
        top_k_mask(&mut filtered, k);
    }
    if let Some(p) = config.top_p {
        top_p_mask(&mut filtered, p);
    }

    // Over-aggressive filtering can empty the candidate set; redo the
    // draw from the scaled-but-unfiltered distribution.
    if filtered.iter().all(|&s| s == f32::NEG_INFINITY) {
        filtered = scaled;
    }

    categorical(&filtered, key.uniform_f32())
}

/// Draw one index from `exp(scores)` weights using a uniform in [0, 1).
fn categorical(scores: &[f32], r: f32) -> u32 {
    let probs = probabilities(scores);
    let sum: f32 = probs.iter().sum();
    if sum <= 0.0 {
        // Every candidate has zero weight; nothing to draw from.
        return argmax(scores);
    }

    let target = r * sum;
    let mut cumulative = 0.0f32;
    let mut last_nonzero = 0u32;
    for (i, &p) in probs.iter().enumerate() {
        if p > 0.0 {
            last_nonzero = i as u32;
        }
        cumulative += p;
        if cumulative > target {
            return i as u32;
        }
    }
    // Float accumulation can land just short of the final boundary.
    last_nonzero
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampling(seed: u64) -> SamplingConfig {
        SamplingConfig {
            do_sample: true,
            seed: Some(seed),
            ..Default::default()
        }
    }

    fn key(seed: u64) -> StreamKey {
        StreamKey::from_seed(seed)
    }

    #[test]
    fn test_argmax_basic() {
        assert_eq!(argmax(&[1.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[5.0, 1.0, 2.0]), 0);
        assert_eq!(argmax(&[1.0, 2.0, 5.0]), 2);
    }

    #[test]
    fn test_argmax_negative() {
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), 1);
    }

    #[test]
    fn test_greedy_ignores_randomness_and_knobs() {
        let scores = vec![1.0, 5.0, 2.0, 3.0];
        let config = SamplingConfig {
            do_sample: false,
            temperature: Some(100.0),
            top_k: Some(1),
            top_p: Some(0.1),
            min_p: Some(0.9),
            seed: None,
        };
        assert_eq!(sample_token(&scores, &config, key(1)), 1);
        assert_eq!(sample_token(&scores, &config, key(2)), 1);
    }

    #[test]
    fn test_sampling_deterministic_given_key() {
        let scores = vec![1.0, 5.0, 2.0, 3.0];
        let config = SamplingConfig {
            temperature: Some(1.0),
            ..sampling(42)
        };
        let t1 = sample_token(&scores, &config, key(42));
        let t2 = sample_token(&scores, &config, key(42));
        assert_eq!(t1, t2, "same key must produce the same token");
    }

    #[test]
    fn test_sampling_varies_across_keys() {
        // Flat scores: every token equally likely, so 64 independent
        // draws over 50 tokens cannot all agree.
        let scores = vec![0.0f32; 50];
        let config = sampling(0);
        let first = sample_token(&scores, &config, key(0).fold_in(0));
        let all_same = (1..64).all(|i| sample_token(&scores, &config, key(0).fold_in(i)) == first);
        assert!(!all_same, "independent keys should not all produce {}", first);
    }

    #[test]
    fn test_top_k_one_always_picks_argmax() {
        let scores = vec![1.0, 10.0, 2.0, 3.0];
        let config = SamplingConfig {
            top_k: Some(1),
            ..sampling(7)
        };
        for i in 0..20 {
            assert_eq!(sample_token(&scores, &config, key(7).fold_in(i)), 1);
        }
    }

    #[test]
    fn test_tiny_top_p_picks_top_token() {
        let scores = vec![0.0, 100.0, 0.0, 0.0];
        let config = SamplingConfig {
            top_p: Some(0.01),
            ..sampling(3)
        };
        assert_eq!(sample_token(&scores, &config, key(3)), 1);
    }

    #[test]
    fn test_low_temperature_concentrates_on_argmax() {
        let scores = vec![1.0, 2.0, 3.0, 4.0];
        let config = SamplingConfig {
            temperature: Some(0.01),
            ..sampling(42)
        };
        let mut count_top = 0;
        for i in 0..100 {
            if sample_token(&scores, &config, key(42).fold_in(i)) == 3 {
                count_top += 1;
            }
        }
        assert!(
            count_top > 90,
            "low temperature should favor the top token, got {}/100",
            count_top
        );
    }

    #[test]
    fn test_aggressive_filter_combination_still_valid() {
        // top_k = 1 plus a min_p that would exclude everything but the
        // arg-max must still return an in-vocabulary token.
        let scores = vec![1.0, 10.0, 2.0, 3.0];
        let config = SamplingConfig {
            top_k: Some(1),
            min_p: Some(1.0),
            top_p: Some(0.001),
            temperature: Some(0.5),
            ..sampling(11)
        };
        for i in 0..20 {
            let token = sample_token(&scores, &config, key(11).fold_in(i));
            assert!((token as usize) < scores.len(), "token {} out of vocab", token);
            assert!(!scores[token as usize].is_nan());
        }
    }

    #[test]
    fn test_fallback_on_fully_masked_scores() {
        // A row that is already all -inf exercises the degenerate path;
        // the draw must still return an index, not panic or NaN.
        let scores = vec![f32::NEG_INFINITY; 4];
        let config = sampling(5);
        let token = sample_token(&scores, &config, key(5));
        assert!((token as usize) < 4);
    }

    #[test]
    fn test_sampled_tokens_within_vocab() {
        let scores = vec![0.5f32; 100];
        let config = sampling(9);
        for i in 0..200 {
            let token = sample_token(&scores, &config, key(9).fold_in(i));
            assert!((token as usize) < 100, "token out of range: {}", token);
        }
    }

    #[test]
    fn test_categorical_respects_weights() {
        // Token 0 holds ~99.97% of the mass after softmax.
        let scores = vec![10.0, 0.0, 0.0];
        let mut count0 = 0;
        for i in 0..100 {
            if categorical(&scores, key(13).fold_in(i).uniform_f32()) == 0 {
                count0 += 1;
            }
        }
        assert!(count0 > 95, "expected heavy bias to token 0, got {}/100", count0);
    }

    #[test]
    fn test_categorical_r_near_one_returns_valid_index() {
        let scores = vec![0.0, 0.0, 0.0];
        let token = categorical(&scores, 0.999_999_9);
        assert!((token as usize) < 3);
    }

    #[test]
    fn test_sampling_config_default_is_all_disabled() {
        let config = SamplingConfig::default();
        assert!(!config.do_sample);
        assert!(config.temperature.is_none());
        assert!(config.top_k.is_none());
        assert!(config.top_p.is_none());
        assert!(config.min_p.is_none());
        assert!(config.seed.is_none());
    }
}
