use rand::Rng;
use serde::{Deserialize, Serialize};

/// Seed value that asks the runner to pick a fresh random seed for the run.
///
/// The resolved value is kept by the session so that the user can re-run with the same seed.
pub const RANDOM_SEED: i64 = -1;

/// Sampling options passed through to the serving daemon with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    temperature: f32,
    seed: i64,
}

impl SamplingOptions {
    /// Create sampling options. The temperature is clamped to the supported range of 0.0 to 1.0.
    pub fn new(temperature: f32, seed: i64) -> Self {
        Self {
            temperature: temperature.clamp(0.0, 1.0),
            seed,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Resolve the configured seed to the value that will be sent with generation requests.
    ///
    /// [RANDOM_SEED] resolves to a fresh random 32-bit value. Any other seed is used as-is.
    pub fn resolve_seed(&self) -> u32 {
        if self.seed == RANDOM_SEED {
            rand::thread_rng().gen()
        } else {
            self.seed as u32
        }
    }
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn temperature_is_clamped() {
        assert_eq!(1.0, SamplingOptions::new(3.7, 0).temperature());
        assert_eq!(0.0, SamplingOptions::new(-0.5, 0).temperature());
        assert_eq!(0.4, SamplingOptions::new(0.4, 0).temperature());
    }

    #[test]
    fn fixed_seed_resolves_to_itself() {
        assert_eq!(42, SamplingOptions::new(0.0, 42).resolve_seed());
    }
}
