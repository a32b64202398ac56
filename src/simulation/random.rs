//! Injectable randomness for the clocks, synthesizer and jitter engine
//! Location: src/simulation/random.rs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random source shared by every stochastic path in the engine
pub trait RandomSource: Send {
    /// Uniform sample in [0, 1)
    fn next_unit(&mut self) -> f64;

    /// Uniform sample in [-half_width, +half_width)
    fn symmetric(&mut self, half_width: f64) -> f64 {
        (self.next_unit() * 2.0 - 1.0) * half_width
    }

    /// Bernoulli trial
    fn chance(&mut self, probability: f64) -> bool {
        self.next_unit() < probability
    }
}

/// Seeded generator for reproducible sessions and tests
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Source that always returns the same value; used to pin stochastic branches
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

/// Build a boxed source from an optional seed
pub fn source_from_seed(seed: Option<u64>) -> Box<dyn RandomSource> {
    match seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(SeededRandom::from_entropy()),
    }
}
