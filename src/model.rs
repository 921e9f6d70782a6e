//! The scoring capability the engine consumes.
//!
//! The decoding engine never sees the model's internals. Any type that
//! can map a token buffer and attention mask to next-token logits can be
//! decoded; there is no base-type coupling.

use crate::error::DecodeError;
use crate::tensor::{AttentionMask, Logits, TokenBuffer};

/// A trained sequence model, seen purely as a scoring function.
pub trait ScoreModel {
    /// Size of the token vocabulary. Logits rows must have this width.
    fn vocab_size(&self) -> usize;

    /// Score every position of `tokens`, attending only to positions the
    /// mask marks valid.
    ///
    /// Returns logits of shape `[batch, seq_len, vocab]` where `batch`
    /// and `seq_len` match `tokens`. The engine always calls with
    /// `deterministic = true`: decode-time randomness belongs to the
    /// sampler, not the model.
    fn score(
        &self,
        tokens: &TokenBuffer,
        mask: &AttentionMask,
        deterministic: bool,
    ) -> Result<Logits, DecodeError>;

    /// Model-level default pad token, used when the caller supplies none.
    fn pad_token_id(&self) -> Option<u32> {
        None
    }

    /// Stable identity string, part of the decode plan cache key.
    ///
    /// Two models with the same id are assumed interchangeable for plan
    /// reuse; give distinct checkpoints distinct ids.
    fn model_id(&self) -> &str;
}
