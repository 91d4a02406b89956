//! Uniform random indices
//!
//! Every row of the table is equally likely. Uses the xoshiro256++ PRNG,
//! which is fast and statistically sound for workload generation.
//!
//! # Example
//!
//! ```
//! use embpulse::distribution::{Distribution, uniform::UniformDistribution};
//!
//! let mut dist = UniformDistribution::with_seed(7);
//! for _ in 0..10 {
//!     assert!(dist.next_index(1024) < 1024);
//! }
//! ```

use super::Distribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniform random distribution over `[0, num_rows)`
pub struct UniformDistribution {
    rng: Xoshiro256PlusPlus,
}

impl UniformDistribution {
    /// Create a new uniform distribution with random seed
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Create a new uniform distribution with specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Default for UniformDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Distribution for UniformDistribution {
    #[inline(always)]
    fn next_index(&mut self, num_rows: u64) -> u64 {
        if num_rows == 0 {
            return 0;
        }
        self.rng.gen_range(0..num_rows)
    }
}
