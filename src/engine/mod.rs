//! The decoding engine.
//!
//! - [`logits`]: stateless transform library (temperature, top-k, top-p, min-p)
//! - [`sampler`]: greedy arg-max and the stochastic sampling pipeline
//! - [`generate`]: [`Decoder`] — validation, defaults, direct decode loop
//! - [`plan`]: staged fixed-shape execution and the plan cache

pub mod generate;
pub mod logits;
pub mod plan;
pub mod sampler;

pub(crate) mod step;

pub use generate::{Decoder, GenerationConfig};
pub use plan::{DecodePlan, PlanCache, PlanKey};
pub use sampler::SamplingConfig;
