//! Splittable deterministic random streams for sampling.
//!
//! Decoding needs reproducible randomness that can be partitioned: one
//! sub-stream per step, one draw per batch row, with every stream
//! independent of every other. The `rand` crate has no splittable-key
//! primitive, so we use a counter-based SplitMix64 key, which gives
//! byte-identical draws for identical seeds across calls.

/// Odd constant used to advance and separate streams (the SplitMix64 gamma).
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// SplitMix64 finalizer. Bijective, so distinct inputs stay distinct.
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A position in a splittable random stream.
///
/// A `StreamKey` is never advanced in place. Instead it is [`split`] into
/// a sub-key consumed by one step's draws and a continuation key threaded
/// to the next step, or [`fold_in`]-ed with a row index to obtain
/// per-row keys that are independent of each other.
///
/// [`split`]: StreamKey::split
/// [`fold_in`]: StreamKey::fold_in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamKey {
    state: u64,
}

impl StreamKey {
    /// Derive the root key of a stream from a user-supplied seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            state: mix64(seed ^ GOLDEN_GAMMA),
        }
    }

    /// Split into (step sub-key, continuation key).
    ///
    /// The two results are independent of each other and of `self`;
    /// neither should be used together with `self` afterwards.
    pub fn split(self) -> (StreamKey, StreamKey) {
        let a = StreamKey {
            state: mix64(self.state.wrapping_add(GOLDEN_GAMMA)),
        };
        let b = StreamKey {
            state: mix64(self.state.wrapping_add(GOLDEN_GAMMA.wrapping_mul(2))),
        };
        (a, b)
    }

    /// Derive an independent key for a sub-stream identified by `n`
    /// (e.g. a batch row index).
    pub fn fold_in(self, n: u64) -> StreamKey {
        StreamKey {
            state: mix64(self.state ^ mix64(n.wrapping_add(GOLDEN_GAMMA))),
        }
    }

    /// The uniform f32 in [0, 1) at this stream position.
    ///
    /// Pure function of the key: calling it twice returns the same value.
    pub fn uniform_f32(self) -> f32 {
        // Top 24 bits, so the result is exactly representable.
        (mix64(self.state) >> 40) as f32 / (1u64 << 24) as f32
    }
}
