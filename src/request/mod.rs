//! Lookup request generation
//!
//! A request ("batch") for `T` tables with batch size `B` holds:
//!
//! - `indices`: the flat concatenation of every table's `B * L_t` row indices
//! - `offsets`: `T * B + 1` bag boundaries into `indices`
//! - `weights`: optional per-sample weights, one per index
//!
//! Tables are laid out back to back, so the offsets of table `t + 1` continue
//! from the last offset of table `t`:
//!
//! ```text
//! table 0 (B=2, L=2): indices [a a | a a]      offsets [0, 2, 4]
//! table 1 (B=2, L=3): indices [b b b | b b b]  offsets       [7, 10]
//! batch:              indices [a a a a b b b b b b]
//!                     offsets [0, 2, 4, 7, 10]
//! ```
//!
//! [`RequestGenerator`] builds one table, [`builder::BatchBuilder`] chains
//! tables (or loads a precomputed batch), and
//! [`generator::SplitTableInputDataGenerator`] is the per-configuration entry
//! point used by the bench loop.

pub mod builder;
pub mod generator;
pub mod source;

use crate::config::workload::{SparseType, WeightsInit};
use crate::distribution::{sample_indices, IndexPolicy};
use crate::error::ConfigError;
use crate::tensor::{Device, Tensor};
use crate::Result;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use source::TensorOverrides;
use tracing::debug;

/// One embedding table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub rows: u64,
    pub dim: u64,
}

/// Parameters of one benchmark iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestConfig {
    pub num_tables: usize,
    pub rows: Vec<u64>,
    pub dims: Vec<u64>,
    pub batch_size: u64,
    pub pooling_factors: Vec<u64>,
    pub weighted: bool,
    pub weights_precision: SparseType,
    #[serde(skip_serializing_if = "is_default_overrides")]
    pub overrides: TensorOverrides,
}

fn is_default_overrides(overrides: &TensorOverrides) -> bool {
    *overrides == TensorOverrides::default()
}

impl RequestConfig {
    /// Table specs in table order
    pub fn tables(&self) -> Vec<TableSpec> {
        self.rows
            .iter()
            .zip(&self.dims)
            .map(|(&rows, &dim)| TableSpec { rows, dim })
            .collect()
    }

    /// Number of bags across all tables
    pub fn num_bags(&self) -> usize {
        self.num_tables * self.batch_size as usize
    }

    /// Number of indices across all tables
    pub fn num_indices(&self) -> usize {
        self.pooling_factors
            .iter()
            .map(|&l| (self.batch_size * l) as usize)
            .sum()
    }
}

/// Indices, offsets and weights of a single table
#[derive(Debug, Clone, PartialEq)]
pub struct TableRequest {
    pub indices: Vec<i64>,
    pub offsets: Vec<i64>,
    pub weights: Option<Vec<f32>>,
}

/// Final request handed to the operator
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub indices: Tensor<i64>,
    pub offsets: Tensor<i64>,
    pub weights: Option<Tensor<f32>>,
}

impl Batch {
    /// Number of bags described by the offsets
    pub fn num_bags(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn to(self, device: Device) -> Self {
        Self {
            indices: self.indices.to(device),
            offsets: self.offsets.to(device),
            weights: self.weights.map(|w| w.to(device)),
        }
    }

    /// Check the batch is consistent with `expected_bags` bags
    pub fn validate(&self, expected_bags: usize) -> Result<()> {
        if self.offsets.len() != expected_bags + 1 {
            return Err(ConfigError::OverrideShape {
                field: "offsets",
                expected: expected_bags + 1,
                found: self.offsets.len(),
            }
            .into());
        }

        let offsets = self.offsets.as_slice();
        if let Some(pos) = offsets.windows(2).position(|w| w[0] > w[1]) {
            anyhow::bail!(
                "offsets must be non-decreasing: offsets[{}]={} > offsets[{}]={}",
                pos,
                offsets[pos],
                pos + 1,
                offsets[pos + 1]
            );
        }

        let last = offsets.last().copied().unwrap_or(0);
        if last != self.indices.len() as i64 {
            return Err(ConfigError::OverrideShape {
                field: "indices",
                expected: last.max(0) as usize,
                found: self.indices.len(),
            }
            .into());
        }

        if let Some(weights) = &self.weights {
            if weights.len() != self.indices.len() {
                return Err(ConfigError::OverrideShape {
                    field: "weights",
                    expected: self.indices.len(),
                    found: weights.len(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Generates per-table requests
///
/// Owns the RNG every random draw comes from: index distributions get a seed
/// derived from it, weights are drawn from it directly. Two generators with
/// the same seed produce the same requests.
pub struct RequestGenerator {
    rng: Xoshiro256PlusPlus,
    weights_init: WeightsInit,
}

impl RequestGenerator {
    /// Create a generator with random seed
    pub fn new(weights_init: WeightsInit) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
            weights_init,
        }
    }

    /// Create a generator with specific seed
    pub fn with_seed(seed: u64, weights_init: WeightsInit) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            weights_init,
        }
    }

    /// Generate the request of one table
    ///
    /// Offsets are `offset_start + cumsum(lengths)`. `None` starts a fresh
    /// chain at 0 and emits the leading zero; `Some(start)` continues the
    /// previous table's offsets without repeating its boundary.
    pub fn generate_request(
        &mut self,
        batch_size: u64,
        pooling_factor: u64,
        num_rows: u64,
        offset_start: Option<i64>,
        alpha: f64,
        weighted: bool,
    ) -> Result<TableRequest> {
        let policy = IndexPolicy::from_alpha(alpha);
        let seed = self.rng.gen::<u64>();
        let indices = sample_indices(batch_size, pooling_factor, num_rows, alpha, seed)?;

        let mut offsets = Vec::with_capacity(batch_size as usize + 1);
        let mut running = match offset_start {
            Some(start) => start,
            None => {
                offsets.push(0);
                0
            }
        };
        for _ in 0..batch_size {
            running += pooling_factor as i64;
            offsets.push(running);
        }

        let weights = if weighted {
            Some(self.sample_weights(indices.len()))
        } else {
            None
        };

        debug!(
            %policy,
            batch_size,
            pooling_factor,
            num_rows,
            ?offset_start,
            indices = indices.len(),
            offsets = offsets.len(),
            weighted,
            "Generated table request"
        );

        Ok(TableRequest {
            indices,
            offsets,
            weights,
        })
    }

    fn sample_weights(&mut self, count: usize) -> Vec<f32> {
        match self.weights_init {
            WeightsInit::Uniform => (0..count).map(|_| self.rng.gen::<f32>()).collect(),
            WeightsInit::Normal => (0..count)
                .map(|_| self.rng.sample::<f32, _>(StandardNormal))
                .collect(),
        }
    }
}
