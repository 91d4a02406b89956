//! Zipf index distribution
//!
//! Power-law lookups: a handful of hot rows receive most of the traffic, the
//! way real categorical features behave.
//!
//! Samples come from the unbounded Zipf (zeta) distribution with shape
//! `alpha > 1`, `P(k) ∝ k^-alpha` for `k = 1, 2, ...`, and are reduced modulo
//! the table size. Larger `alpha` means a hotter head.
//!
//! # Example
//!
//! ```
//! use embpulse::distribution::{Distribution, zipf::ZipfDistribution};
//!
//! let mut dist = ZipfDistribution::with_seed(1.2, 3).unwrap();
//! assert!(dist.next_index(1000) < 1000);
//! ```

use super::Distribution;
use crate::Result;
use rand::SeedableRng;
use rand_distr::{Distribution as _, Zeta};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Zipf distribution reduced modulo the table size
pub struct ZipfDistribution {
    zeta: Zeta<f64>,
    rng: Xoshiro256PlusPlus,
}

impl ZipfDistribution {
    /// Create a Zipf distribution with random seed
    ///
    /// Fails unless `alpha > 1`.
    pub fn new(alpha: f64) -> Result<Self> {
        Self::with_rng(alpha, Xoshiro256PlusPlus::from_entropy())
    }

    /// Create a Zipf distribution with specific seed
    pub fn with_seed(alpha: f64, seed: u64) -> Result<Self> {
        Self::with_rng(alpha, Xoshiro256PlusPlus::seed_from_u64(seed))
    }

    fn with_rng(alpha: f64, rng: Xoshiro256PlusPlus) -> Result<Self> {
        let zeta = Zeta::new(alpha)
            .map_err(|e| anyhow::anyhow!("Invalid Zipf shape {}: {}", alpha, e))?;
        Ok(Self { zeta, rng })
    }
}

impl Distribution for ZipfDistribution {
    fn next_index(&mut self, num_rows: u64) -> u64 {
        if num_rows == 0 {
            return 0;
        }

        // Ranks start at 1; the tail saturates at u64::MAX on conversion
        let rank = self.zeta.sample(&mut self.rng) as u64;
        rank % num_rows
    }
}
