//! One decode step: score, sample, update termination, write.
//!
//! The carry is exclusively owned by the loop driving this function;
//! each call consumes one carry and returns the next. Input validation
//! is the dispatcher's job — by the time a step runs, shapes and lengths
//! are known good, and the only failures left are model errors.

use crate::engine::sampler::{sample_token, SamplingConfig};
use crate::error::DecodeError;
use crate::model::ScoreModel;
use crate::rng::StreamKey;
use crate::tensor::{AttentionMask, TokenBuffer};

/// The functional state threaded between successive decode steps.
#[derive(Debug, Clone)]
pub(crate) struct Carry {
    /// Token grid `[batch, max_length]`; positions >= `cur_len` hold pad.
    pub tokens: TokenBuffer,
    /// Shared write cursor; all rows advance in lockstep.
    pub cur_len: usize,
    /// Per-row termination flags. Monotone: set once, never cleared.
    pub finished: Vec<bool>,
    /// Random stream continuation for the remaining steps.
    pub key: StreamKey,
}

/// Advance the carry by one token per row.
///
/// The mask must mark positions `< carry.cur_len` valid; direct mode
/// builds it fresh each step, staged mode passes a prebuilt one. A row
/// that emits the eos token on this step still writes that token; pad
/// overwrites begin on the following step.
pub(crate) fn step<M: ScoreModel>(
    mut carry: Carry,
    model: &M,
    sampling: &SamplingConfig,
    eos_token_id: Option<u32>,
    pad_token_id: u32,
    mask: &AttentionMask,
) -> Result<Carry, DecodeError> {
    let batch = carry.tokens.rows();
    let max_len = carry.tokens.cols();
    let vocab = model.vocab_size();

    let logits = model.score(&carry.tokens, mask, true)?;
    let expected = [batch, max_len, vocab];
    if logits.shape() != expected {
        return Err(DecodeError::LogitsShape {
            expected: expected.to_vec(),
            actual: logits.shape().to_vec(),
        });
    }

    // Fresh sub-stream per step so draws are independent across steps.
    // Greedy mode consumes no randomness and leaves the key untouched.
    let (step_key, next_key) = if sampling.do_sample {
        carry.key.split()
    } else {
        (carry.key, carry.key)
    };

    let read_pos = carry.cur_len - 1;
    let write_pos = carry.cur_len;
    for row in 0..batch {
        let scores = logits.row(row, read_pos);
        let candidate = sample_token(scores, sampling, step_key.fold_in(row as u64));

        let was_finished = carry.finished[row];
        if let Some(eos) = eos_token_id {
            carry.finished[row] = was_finished || candidate == eos;
        }

        let written = if was_finished { pad_token_id } else { candidate };
        carry.tokens.set(row, write_pos, written);
    }

    carry.cur_len += 1;
    carry.key = next_key;
    Ok(carry)
}
