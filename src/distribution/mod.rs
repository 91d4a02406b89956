//! Index distributions for embedding lookups
//!
//! This module generates the row indices of a synthetic lookup request. The
//! skew parameter `alpha` selects one of four policies:
//!
//! | alpha            | policy                                   |
//! |------------------|------------------------------------------|
//! | `== 0`           | linear, `index[i] = i mod L`             |
//! | `(0, 0.5]`       | linear, `index[i] = i mod E`             |
//! | `(0.5, 1.0]`     | uniform in `[0, E)`                      |
//! | `> 1.0`          | Zipf with shape `alpha`, reduced mod `E` |
//!
//! where `L` is the pooling factor and `E` the number of rows in the table.
//!
//! # Example
//!
//! ```
//! use embpulse::distribution::sample_indices;
//!
//! let indices = sample_indices(2, 3, 10, 0.0, 42).unwrap();
//! assert_eq!(indices, vec![0, 1, 2, 0, 1, 2]);
//! ```

use crate::Result;
use std::fmt;

pub mod linear;
pub mod uniform;
pub mod zipf;

use linear::LinearDistribution;
use uniform::UniformDistribution;
use zipf::ZipfDistribution;

/// Row index generator
///
/// Each implementation owns its own state (and RNG where needed), so a
/// distribution can be handed to whoever builds the request without sharing.
pub trait Distribution: Send {
    /// Generate the next index in `[0, num_rows)`
    ///
    /// Returns 0 when `num_rows` is 0; callers are expected to pass a
    /// positive table size.
    fn next_index(&mut self, num_rows: u64) -> u64;
}

/// Index generation policy selected by the skew parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexPolicy {
    /// Linear sequence wrapping at the pooling factor
    LinearByPooling,
    /// Linear sequence wrapping at the table size
    LinearByRows,
    Uniform,
    Zipf { alpha: f64 },
}

impl IndexPolicy {
    pub fn from_alpha(alpha: f64) -> Self {
        if alpha == 0.0 {
            IndexPolicy::LinearByPooling
        } else if alpha <= 0.5 {
            IndexPolicy::LinearByRows
        } else if alpha <= 1.0 {
            IndexPolicy::Uniform
        } else {
            IndexPolicy::Zipf { alpha }
        }
    }

    /// Range the distribution draws from
    pub fn period(&self, pooling_factor: u64, num_rows: u64) -> u64 {
        match self {
            IndexPolicy::LinearByPooling => pooling_factor,
            _ => num_rows,
        }
    }
}

impl fmt::Display for IndexPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexPolicy::LinearByPooling => write!(f, "linear(pooling)"),
            IndexPolicy::LinearByRows => write!(f, "linear(rows)"),
            IndexPolicy::Uniform => write!(f, "uniform"),
            IndexPolicy::Zipf { alpha } => write!(f, "zipf(alpha={})", alpha),
        }
    }
}

/// Create the distribution for a policy
///
/// `seed` only matters for the random policies.
pub fn create_distribution(policy: IndexPolicy, seed: u64) -> Result<Box<dyn Distribution>> {
    let dist: Box<dyn Distribution> = match policy {
        IndexPolicy::LinearByPooling | IndexPolicy::LinearByRows => {
            Box::new(LinearDistribution::new())
        }
        IndexPolicy::Uniform => Box::new(UniformDistribution::with_seed(seed)),
        IndexPolicy::Zipf { alpha } => Box::new(ZipfDistribution::with_seed(alpha, seed)?),
    };

    Ok(dist)
}

/// Sample `batch_size * pooling_factor` indices for one table
pub fn sample_indices(
    batch_size: u64,
    pooling_factor: u64,
    num_rows: u64,
    alpha: f64,
    seed: u64,
) -> Result<Vec<i64>> {
    let policy = IndexPolicy::from_alpha(alpha);
    let period = policy.period(pooling_factor, num_rows);
    let mut dist = create_distribution(policy, seed)?;

    let count = (batch_size * pooling_factor) as usize;
    let mut indices = Vec::with_capacity(count);
    for _ in 0..count {
        indices.push(dist.next_index(period) as i64);
    }

    Ok(indices)
}
