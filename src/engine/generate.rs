//! Decoding engine: prompt buffer → padded completion buffer.
//!
//! [`Decoder`] wraps any [`ScoreModel`] and drives the step function for
//! a fixed trip count, either directly (mask built per step, ordinary
//! control flow) or through a cached fixed-shape [`DecodePlan`]. Both
//! modes produce bit-identical output; the staged mode only amortizes
//! per-call setup across calls sharing a specialization key.

use tracing::{debug, info};

use crate::engine::plan::{PlanCache, PlanKey};
use crate::engine::sampler::SamplingConfig;
use crate::engine::step::{step, Carry};
use crate::error::DecodeError;
use crate::model::ScoreModel;
use crate::rng::StreamKey;
use crate::tensor::{AttentionMask, TokenBuffer};

use serde::{Deserialize, Serialize};

/// Configuration for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Total output length per row, prompt included.
    pub max_length: usize,
    /// Fill value for unwritten and post-finish positions. Falls back to
    /// the model default, then to 0.
    pub pad_token_id: Option<u32>,
    /// Rows that emit this token stop advancing. Unset disables stopping
    /// and generation always runs to `max_length`.
    pub eos_token_id: Option<u32>,
    /// Run through the cached fixed-shape plan instead of the direct loop.
    pub use_plan: bool,
    /// Sampling pipeline knobs.
    pub sampling: SamplingConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 128,
            pad_token_id: None,
            eos_token_id: None,
            use_plan: false,
            sampling: SamplingConfig::default(),
        }
    }
}

/// Autoregressive decoder over an injected scoring capability.
pub struct Decoder<M: ScoreModel> {
    model: M,
    plans: PlanCache,
}

impl<M: ScoreModel> Decoder<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            plans: PlanCache::new(),
        }
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The decode plan cache (staged-mode artifacts).
    pub fn plan_cache(&self) -> &PlanCache {
        &self.plans
    }

    /// Generate completions for every prompt row.
    ///
    /// The prompt is a 2-D buffer `[batch, initial_length]`; the result
    /// is `[batch, max_length]` with positions beyond each row's
    /// point-of-finish holding the pad token. All validation happens up
    /// front: the call either completes whole or is rejected before the
    /// first step.
    pub fn generate(
        &self,
        prompt: &TokenBuffer,
        config: &GenerationConfig,
    ) -> Result<TokenBuffer, DecodeError> {
        validate(prompt, config)?;

        let batch = prompt.rows();
        let initial_length = prompt.cols();
        let max_length = config.max_length;
        let pad_token_id = config
            .pad_token_id
            .or_else(|| self.model.pad_token_id())
            .unwrap_or(0);
        let eos_token_id = config.eos_token_id;

        info!(
            batch,
            initial_length,
            max_length,
            do_sample = config.sampling.do_sample,
            use_plan = config.use_plan,
            model_id = %self.model.model_id(),
            "Starting generation"
        );

        // Prompt rows that already end in eos start out finished.
        let finished: Vec<bool> = (0..batch)
            .map(|row| eos_token_id == Some(prompt.get(row, initial_length - 1)))
            .collect();

        let mut tokens = TokenBuffer::filled(batch, max_length, pad_token_id);
        for row in 0..batch {
            for pos in 0..initial_length {
                tokens.set(row, pos, prompt.get(row, pos));
            }
        }

        if initial_length == max_length {
            debug!("Prompt already at max_length, zero steps");
            return Ok(tokens);
        }

        // Seed is validated present when sampling; greedy never reads it.
        let seed = config.sampling.seed.unwrap_or(0);
        let carry = Carry {
            tokens,
            cur_len: initial_length,
            finished,
            key: StreamKey::from_seed(seed),
        };

        if config.use_plan {
            let key = PlanKey::new(
                batch,
                max_length,
                initial_length,
                &config.sampling,
                pad_token_id,
                eos_token_id,
                self.model.model_id(),
            );
            let plan = self.plans.get_or_build(key, &config.sampling);
            return plan.run(carry, &self.model);
        }

        self.run_direct(carry, config, eos_token_id, pad_token_id)
    }

    /// Direct mode: fixed trip count, mask rebuilt every step. No early
    /// exit even when every row has finished — finished rows keep
    /// rewriting pad, which is a content no-op.
    fn run_direct(
        &self,
        mut carry: Carry,
        config: &GenerationConfig,
        eos_token_id: Option<u32>,
        pad_token_id: u32,
    ) -> Result<TokenBuffer, DecodeError> {
        let steps = config.max_length - carry.cur_len;
        let batch = carry.tokens.rows();
        for _ in 0..steps {
            let mask = AttentionMask::prefix(batch, config.max_length, carry.cur_len);
            carry = step(
                carry,
                &self.model,
                &config.sampling,
                eos_token_id,
                pad_token_id,
                &mask,
            )?;
        }
        debug!(steps, "Generation complete");
        Ok(carry.tokens)
    }
}

/// Fail-fast input validation. Nothing here is retried; a rejected call
/// runs zero steps.
fn validate(prompt: &TokenBuffer, config: &GenerationConfig) -> Result<(), DecodeError> {
    if prompt.rows() == 0 || prompt.cols() == 0 {
        return Err(DecodeError::InvalidPrompt(format!(
            "prompt must be non-empty 2-D, got [{}, {}]",
            prompt.rows(),
            prompt.cols()
        )));
    }
    if config.max_length < prompt.cols() {
        return Err(DecodeError::MaxLengthTooShort {
            max_length: config.max_length,
            prompt_len: prompt.cols(),
        });
    }

    let sampling = &config.sampling;
    if sampling.do_sample && sampling.seed.is_none() {
        return Err(DecodeError::MissingSeed);
    }
    if let Some(t) = sampling.temperature {
        if t <= 0.0 {
            return Err(DecodeError::InvalidTemperature(t));
        }
    }
    if sampling.top_k == Some(0) {
        return Err(DecodeError::InvalidTopK);
    }
    if let Some(p) = sampling.top_p {
        if p <= 0.0 || p > 1.0 {
            return Err(DecodeError::InvalidTopP(p));
        }
    }
    if let Some(p) = sampling.min_p {
        if !(0.0..=1.0).contains(&p) {
            return Err(DecodeError::InvalidMinP(p));
        }
    }
    Ok(())
}
