//! Staged execution: prebuilt decode plans keyed by their fixed shape.
//!
//! A [`DecodePlan`] freezes everything that affects the control-flow
//! shape of a generation call — lengths, sampling knobs, token ids,
//! model identity — and prebuilds the per-step attention masks once.
//! Plans are immutable after construction and cached in a [`PlanCache`],
//! so repeated calls with the same shape skip the per-call setup. Any
//! change to a fixed parameter produces a different [`PlanKey`] and a
//! fresh build. The seed is deliberately absent from the key: it is
//! runtime-variable and flows through the carry instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::engine::sampler::SamplingConfig;
use crate::engine::step::{step, Carry};
use crate::error::DecodeError;
use crate::model::ScoreModel;
use crate::tensor::{AttentionMask, TokenBuffer};

/// The parameters that must stay fixed for a plan to remain valid.
///
/// Float knobs are keyed by their bit patterns so the key stays `Eq` and
/// `Hash` without tolerance questions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub batch: usize,
    pub max_length: usize,
    pub initial_length: usize,
    pub do_sample: bool,
    pub temperature_bits: Option<u32>,
    pub top_k: Option<usize>,
    pub top_p_bits: Option<u32>,
    pub min_p_bits: Option<u32>,
    pub pad_token_id: u32,
    pub eos_token_id: Option<u32>,
    pub model_id: String,
}

impl PlanKey {
    pub(crate) fn new(
        batch: usize,
        max_length: usize,
        initial_length: usize,
        sampling: &SamplingConfig,
        pad_token_id: u32,
        eos_token_id: Option<u32>,
        model_id: &str,
    ) -> Self {
        Self {
            batch,
            max_length,
            initial_length,
            do_sample: sampling.do_sample,
            temperature_bits: sampling.temperature.map(f32::to_bits),
            top_k: sampling.top_k,
            top_p_bits: sampling.top_p.map(f32::to_bits),
            min_p_bits: sampling.min_p.map(f32::to_bits),
            pad_token_id,
            eos_token_id,
            model_id: model_id.to_string(),
        }
    }
}

/// A fixed-shape build of the decode loop: prebuilt masks plus the
/// frozen sampling configuration. Read-only after construction and safe
/// to share across calls.
pub struct DecodePlan {
    key: PlanKey,
    masks: Vec<AttentionMask>,
    sampling: SamplingConfig,
}

impl DecodePlan {
    pub(crate) fn build(key: PlanKey, sampling: &SamplingConfig) -> Self {
        let steps = key.max_length - key.initial_length;
        let masks = (0..steps)
            .map(|i| AttentionMask::prefix(key.batch, key.max_length, key.initial_length + i))
            .collect();
        debug!(
            steps,
            batch = key.batch,
            max_length = key.max_length,
            model_id = %key.model_id,
            "Built decode plan"
        );
        // The seed never belongs to a plan; it arrives per call via the carry.
        let sampling = SamplingConfig {
            seed: None,
            ..sampling.clone()
        };
        Self { key, masks, sampling }
    }

    /// The specialization key this plan was built for.
    pub fn key(&self) -> &PlanKey {
        &self.key
    }

    /// Number of decode steps the plan runs.
    pub fn steps(&self) -> usize {
        self.masks.len()
    }

    /// Thread a carry through every prebuilt step.
    ///
    /// Bit-identical to the direct loop over the same parameters; the
    /// only difference is that mask construction happened at build time.
    pub(crate) fn run<M: ScoreModel>(
        &self,
        mut carry: Carry,
        model: &M,
    ) -> Result<TokenBuffer, DecodeError> {
        for mask in &self.masks {
            carry = step(
                carry,
                model,
                &self.sampling,
                self.key.eos_token_id,
                self.key.pad_token_id,
                mask,
            )?;
        }
        Ok(carry.tokens)
    }
}

/// Cache of decode plans, keyed by specialization tuple.
///
/// Plans are shared as `Arc`s; the cache lock is held only for the
/// lookup/insert, never while a plan runs.
pub struct PlanCache {
    plans: Mutex<HashMap<PlanKey, Arc<DecodePlan>>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the plan for `key`, building and caching it on first use.
    pub(crate) fn get_or_build(&self, key: PlanKey, sampling: &SamplingConfig) -> Arc<DecodePlan> {
        let mut plans = self.plans.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(plan) = plans.get(&key) {
            return Arc::clone(plan);
        }
        let plan = Arc::new(DecodePlan::build(key.clone(), sampling));
        plans.insert(key, Arc::clone(&plan));
        plan
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.plans.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache holds no plans.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new()
    }
}
