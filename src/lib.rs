pub mod cli;
pub mod engine;
pub mod error;
pub mod model;
pub mod rng;
pub mod tensor;

pub use engine::{Decoder, GenerationConfig, SamplingConfig};
pub use error::DecodeError;
pub use model::ScoreModel;
pub use rng::StreamKey;
pub use tensor::{AttentionMask, Logits, TokenBuffer};
