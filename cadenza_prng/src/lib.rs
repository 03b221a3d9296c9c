// Deterministic, injectable randomness for the harmony engine.
//
// Nothing in the engine reaches for a process-global generator. Every
// operation that makes a random choice (Markov temperature sampling, n-gram
// continuation picks, humanization jitter) takes `&mut impl RandomSource`,
// so a caller owns its own generator and a fixed seed reproduces any call
// exactly.
//
// Two sources ship here:
// - `SeededRng`: xoshiro256++ (Blackman & Vigna, 2019) seeded through
//   SplitMix64. Portable and bit-identical across platforms.
// - `ReplayRng`: cycles through a fixed script of unit-interval values.
//   Tests use it to force a particular branch (e.g. "the 50% early stop
//   fires") without hunting for a seed.
//
// The core generator uses integer arithmetic only. Floating-point helpers
// (`next_f64`, `gaussian`) are derived from `next_u64` and are themselves
// deterministic given the same stream.

use serde::{Deserialize, Serialize};

/// A source of uniformly distributed 64-bit values plus the derived
/// sampling helpers the engine needs.
///
/// Implementors supply `next_u64`; everything else has a default built on it.
pub trait RandomSource {
    /// Next raw 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Uniform `f64` in [0, 1), built from the upper 53 bits.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform `f64` in `[low, high)`. Returns `low` when the range is empty.
    fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        low + self.next_f64() * (high - low)
    }

    /// Uniform integer in `[low, high)`, rejection-sampled to avoid modulo
    /// bias. Returns `low` when the range is empty.
    fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`.
    fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// `true` with probability `p`. `p <= 0` never fires, `p >= 1` always does.
    fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element uniformly. `None` for an empty slice.
    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.range_usize(0, items.len());
        items.get(idx)
    }

    /// Pick an index with probability proportional to `weights[i]`.
    ///
    /// Non-finite and negative weights count as zero. Returns `None` when no
    /// weight is positive.
    fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let total: f64 = weights.iter().copied().map(clean).sum();
        if total <= 0.0 {
            return None;
        }
        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (i, &w) in weights.iter().enumerate() {
            let w = clean(w);
            if w == 0.0 {
                continue;
            }
            cumulative += w;
            last_positive = Some(i);
            if cumulative > target {
                return Some(i);
            }
        }
        // Rounding can leave `cumulative` a hair below `target`.
        last_positive
    }

    /// Normally distributed sample (Box–Muller transform).
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        // 1 - u keeps the log argument in (0, 1].
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        mean + std_dev * z
    }
}

/// Xoshiro256++ generator, the engine's default `RandomSource`.
///
/// Cheap to create, so callers make one per request rather than sharing.
/// Serializable so a paused generation can be resumed with the same stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    s: [u64; 4],
}

impl SeededRng {
    /// Seed from a single `u64`, expanded to 256 bits with SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Derive an independent child generator, e.g. one per worker or per
    /// generated phrase, without disturbing reproducibility of the parent.
    pub fn fork(&mut self) -> Self {
        SeededRng::new(self.next_u64())
    }
}

impl RandomSource for SeededRng {
    fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }
}

/// Replays a fixed script of unit-interval values, cycling when exhausted.
///
/// `next_f64` returns the scripted values (to 53-bit precision). An empty
/// script behaves as a constant 0.0.
#[derive(Clone, Debug)]
pub struct ReplayRng {
    script: Vec<f64>,
    cursor: usize,
}

impl ReplayRng {
    pub fn new(script: Vec<f64>) -> Self {
        ReplayRng { script, cursor: 0 }
    }
}

impl RandomSource for ReplayRng {
    fn next_u64(&mut self) -> u64 {
        let value = if self.script.is_empty() {
            0.0
        } else {
            let v = self.script[self.cursor % self.script.len()];
            self.cursor += 1;
            v
        };
        let unit = value.clamp(0.0, 1.0 - f64::EPSILON);
        ((unit * (1u64 << 53) as f64) as u64) << 11
    }
}

/// SplitMix64 step, used only to expand a seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
