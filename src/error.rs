use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("max_length ({max_length}) is shorter than the prompt length ({prompt_len})")]
    MaxLengthTooShort {
        max_length: usize,
        prompt_len: usize,
    },

    #[error("Sampling requested (do_sample = true) but no seed was supplied")]
    MissingSeed,

    #[error("Temperature must be positive, got {0}")]
    InvalidTemperature(f32),

    #[error("top_k must be at least 1 when enabled")]
    InvalidTopK,

    #[error("top_p must be in (0, 1], got {0}")]
    InvalidTopP(f32),

    #[error("min_p must be in [0, 1], got {0}")]
    InvalidMinP(f32),

    #[error("Logits shape mismatch: expected {expected:?}, got {actual:?}")]
    LogitsShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Model error: {0}")]
    Model(String),
}
