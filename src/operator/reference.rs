//! Naive host embedding-bag kernel
//!
//! One dense `rows x dim` table per declared table, pooled bag by bag. The
//! backward pass folds the output gradient back onto the looked-up rows and
//! applies the configured optimizer once per distinct row, which is what the
//! `exact_*` optimizers promise. Plain `sgd` takes the same path since
//! summing duplicate-row gradients before a linear update is equivalent.
//!
//! Weights are always held as fp32, whatever `weights_precision` says.

use super::{ComputeDevice, EmbeddingBagOperator, OperatorSpec};
use crate::config::workload::{OptimType, PoolingMode};
use crate::tensor::Tensor;
use crate::Result;
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::BTreeMap;
use tracing::debug;

const LEARNING_RATE: f32 = 0.01;
const EPS: f32 = 1.0e-8;

/// Inputs kept from forward for the backward pass
struct SavedBatch {
    indices: Vec<i64>,
    offsets: Vec<i64>,
    weights: Option<Vec<f32>>,
    batch_size: usize,
}

pub struct ReferenceOperator {
    spec: OperatorSpec,
    tables: Vec<Vec<f32>>,
    /// Adagrad accumulators: one per element, or one per row for row-wise
    state: Vec<Vec<f32>>,
    col_offsets: Vec<usize>,
    total_dim: usize,
    saved: Option<SavedBatch>,
}

impl ReferenceOperator {
    pub fn new(spec: &OperatorSpec) -> Result<Self> {
        if spec.compute_device != ComputeDevice::Cpu {
            anyhow::bail!(
                "reference operator only runs on cpu, got {}",
                spec.compute_device
            );
        }
        if spec.pooling == PoolingMode::None {
            anyhow::bail!("reference operator does not support pooling = none");
        }
        if spec.rows.len() != spec.num_tables || spec.dims.len() != spec.num_tables {
            anyhow::bail!(
                "expected {} tables, got {} rows and {} dims",
                spec.num_tables,
                spec.rows.len(),
                spec.dims.len()
            );
        }

        let mut tables = Vec::with_capacity(spec.num_tables);
        let mut state = Vec::with_capacity(spec.num_tables);
        for (t, (&rows, &dim)) in spec.rows.iter().zip(&spec.dims).enumerate() {
            let len = (rows as usize)
                .checked_mul(dim as usize)
                .ok_or_else(|| anyhow::anyhow!("table {} is too large", t))?;

            let bound = (1.0 / rows.max(1) as f32).sqrt();
            let init = Uniform::new_inclusive(-bound, bound);
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(t as u64);
            tables.push((0..len).map(|_| init.sample(&mut rng)).collect());

            state.push(match spec.optimizer {
                OptimType::ExactAdagrad => vec![0.0; len],
                OptimType::ExactRowWiseAdagrad => vec![0.0; rows as usize],
                OptimType::Sgd | OptimType::ExactSgd => Vec::new(),
            });
        }

        let col_offsets = spec
            .dims
            .iter()
            .scan(0usize, |acc, &d| {
                let start = *acc;
                *acc += d as usize;
                Some(start)
            })
            .collect();

        debug!(
            num_tables = spec.num_tables,
            precision = %spec.weights_precision,
            "Reference tables allocated as fp32"
        );

        Ok(Self {
            total_dim: spec.total_dim(),
            spec: spec.clone(),
            tables,
            state,
            col_offsets,
            saved: None,
        })
    }

    /// Row `row` of table `table`
    pub fn row(&self, table: usize, row: usize) -> &[f32] {
        let dim = self.spec.dims[table] as usize;
        &self.tables[table][row * dim..(row + 1) * dim]
    }

    /// Positions `start..end` of bag `bag`, checked against the index list
    fn bag_range(offsets: &[i64], bag: usize, num_indices: usize) -> Result<(usize, usize)> {
        let (start, end) = (offsets[bag], offsets[bag + 1]);
        if start < 0 || end < start || end as usize > num_indices {
            anyhow::bail!(
                "bag {} has invalid offsets [{}, {}) for {} indices",
                bag,
                start,
                end,
                num_indices
            );
        }
        Ok((start as usize, end as usize))
    }

    fn check_row(&self, table: usize, index: i64) -> Result<usize> {
        let rows = self.spec.rows[table];
        if index < 0 || index as u64 >= rows {
            anyhow::bail!(
                "index {} out of range for table {} with {} rows",
                index,
                table,
                rows
            );
        }
        Ok(index as usize)
    }

    fn bag_scale(&self, len: usize) -> f32 {
        match self.spec.pooling {
            PoolingMode::Mean if len > 0 => 1.0 / len as f32,
            _ => 1.0,
        }
    }

    fn apply_update(&mut self, table: usize, row: usize, grad: &[f32]) {
        let dim = grad.len();
        let weights = &mut self.tables[table][row * dim..(row + 1) * dim];

        match self.spec.optimizer {
            OptimType::Sgd | OptimType::ExactSgd => {
                for (w, g) in weights.iter_mut().zip(grad) {
                    *w -= LEARNING_RATE * g;
                }
            }
            OptimType::ExactAdagrad => {
                let acc = &mut self.state[table][row * dim..(row + 1) * dim];
                for ((w, g), a) in weights.iter_mut().zip(grad).zip(acc.iter_mut()) {
                    *a += g * g;
                    *w -= LEARNING_RATE * g / (a.sqrt() + EPS);
                }
            }
            OptimType::ExactRowWiseAdagrad => {
                let acc = &mut self.state[table][row];
                *acc += grad.iter().map(|g| g * g).sum::<f32>() / dim as f32;
                let step = LEARNING_RATE / (acc.sqrt() + EPS);
                for (w, g) in weights.iter_mut().zip(grad) {
                    *w -= step * g;
                }
            }
        }
    }
}

impl EmbeddingBagOperator for ReferenceOperator {
    fn forward(
        &mut self,
        indices: &Tensor<i64>,
        offsets: &Tensor<i64>,
        weights: Option<&Tensor<f32>>,
    ) -> Result<Tensor<f32>> {
        let num_tables = self.spec.num_tables;
        let num_bags = offsets
            .len()
            .checked_sub(1)
            .ok_or_else(|| anyhow::anyhow!("offsets must not be empty"))?;
        if num_bags % num_tables != 0 {
            anyhow::bail!(
                "{} bags do not split evenly over {} tables",
                num_bags,
                num_tables
            );
        }
        if let Some(w) = weights {
            if w.len() != indices.len() {
                anyhow::bail!(
                    "{} per-sample weights for {} indices",
                    w.len(),
                    indices.len()
                );
            }
        }

        let batch_size = num_bags / num_tables;
        let idx = indices.as_slice();
        let offs = offsets.as_slice();
        let per_sample = weights.map(|w| w.as_slice());
        let mut out = vec![0.0f32; batch_size * self.total_dim];

        for t in 0..num_tables {
            let dim = self.spec.dims[t] as usize;
            let col = self.col_offsets[t];
            for s in 0..batch_size {
                let (start, end) = Self::bag_range(offs, t * batch_size + s, idx.len())?;
                let scale = self.bag_scale(end - start);
                let dst = &mut out[s * self.total_dim + col..][..dim];

                for pos in start..end {
                    let row = self.check_row(t, idx[pos])?;
                    let w = per_sample.map_or(1.0, |p| p[pos]) * scale;
                    let src = &self.tables[t][row * dim..(row + 1) * dim];
                    for (d, v) in dst.iter_mut().zip(src) {
                        *d += w * v;
                    }
                }
            }
        }

        self.saved = Some(SavedBatch {
            indices: idx.to_vec(),
            offsets: offs.to_vec(),
            weights: per_sample.map(|p| p.to_vec()),
            batch_size,
        });

        Ok(Tensor::with_shape(out, vec![batch_size, self.total_dim])?.to(indices.device()))
    }

    fn backward(&mut self, grad: &Tensor<f32>) -> Result<()> {
        let saved = self
            .saved
            .take()
            .ok_or_else(|| anyhow::anyhow!("backward called without a forward"))?;
        let expected = saved.batch_size * self.total_dim;
        if grad.len() != expected {
            anyhow::bail!("gradient has {} elements, expected {}", grad.len(), expected);
        }
        let g = grad.as_slice();

        for t in 0..self.spec.num_tables {
            let dim = self.spec.dims[t] as usize;
            let col = self.col_offsets[t];
            let mut row_grads: BTreeMap<usize, Vec<f32>> = BTreeMap::new();

            for s in 0..saved.batch_size {
                let bag = t * saved.batch_size + s;
                let (start, end) = Self::bag_range(&saved.offsets, bag, saved.indices.len())?;
                let scale = self.bag_scale(end - start);
                let src = &g[s * self.total_dim + col..][..dim];

                for pos in start..end {
                    let row = self.check_row(t, saved.indices[pos])?;
                    let w = saved.weights.as_ref().map_or(1.0, |p| p[pos]) * scale;
                    let acc = row_grads.entry(row).or_insert_with(|| vec![0.0; dim]);
                    for (a, v) in acc.iter_mut().zip(src) {
                        *a += w * v;
                    }
                }
            }

            for (row, row_grad) in row_grads {
                self.apply_update(t, row, &row_grad);
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "reference"
    }
}
