//! Multi-table batch construction

use super::source::{InputSource, OverridePaths};
use super::{Batch, RequestGenerator, TableSpec};
use crate::error::ConfigError;
use crate::tensor::{load_tensor, Device, Tensor};
use crate::Result;
use anyhow::Context;
use tracing::debug;

/// Builds one [`Batch`] per configuration
///
/// In generation mode the tables are sampled in order and the running offset
/// is carried from each table to the next. In load mode the tensors are read
/// as-is; shape checks only run when `validate_overrides` is set.
pub struct BatchBuilder {
    generator: RequestGenerator,
    validate_overrides: bool,
    tables_generated: u64,
}

impl BatchBuilder {
    pub fn new(generator: RequestGenerator) -> Self {
        Self {
            generator,
            validate_overrides: false,
            tables_generated: 0,
        }
    }

    pub fn with_validation(mut self, validate_overrides: bool) -> Self {
        self.validate_overrides = validate_overrides;
        self
    }

    /// Tables sampled so far (zero when every batch was loaded)
    pub fn tables_generated(&self) -> u64 {
        self.tables_generated
    }

    /// Build the batch for `tables` and place it on `device`
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &mut self,
        tables: &[TableSpec],
        batch_size: u64,
        pooling_factors: &[u64],
        weighted: bool,
        alpha: f64,
        source: &InputSource,
        device: Device,
    ) -> Result<Batch> {
        let batch = match source {
            InputSource::Loaded(paths) => {
                let batch = load_batch(paths, device)?;
                if self.validate_overrides {
                    batch
                        .validate(tables.len() * batch_size as usize)
                        .context("Override tensors do not match the request")?;
                }
                batch
            }
            InputSource::Generated => {
                self.generate(tables, batch_size, pooling_factors, weighted, alpha)?
            }
        };

        debug!(
            indices = batch.indices.len(),
            offsets = batch.offsets.len(),
            weights = ?batch.weights.as_ref().map(|w| w.len()),
            %device,
            "Built batch"
        );

        Ok(batch.to(device))
    }

    fn generate(
        &mut self,
        tables: &[TableSpec],
        batch_size: u64,
        pooling_factors: &[u64],
        weighted: bool,
        alpha: f64,
    ) -> Result<Batch> {
        if pooling_factors.len() != tables.len() {
            return Err(ConfigError::TableCount {
                field: "pooling_factor",
                expected: tables.len(),
                found: pooling_factors.len(),
            }
            .into());
        }

        let mut indices_list = Vec::with_capacity(tables.len());
        let mut offsets_list = Vec::with_capacity(tables.len());
        let mut weights_list = Vec::with_capacity(tables.len());
        let mut offset_start = None;

        for (table, &pooling_factor) in tables.iter().zip(pooling_factors) {
            let request = self.generator.generate_request(
                batch_size,
                pooling_factor,
                table.rows,
                offset_start,
                alpha,
                weighted,
            )?;
            self.tables_generated += 1;

            // Next table continues from the last boundary; only table 0 emits the leading 0
            if let Some(&last) = request.offsets.last() {
                offset_start = Some(last);
            }

            indices_list.push(Tensor::from_vec(request.indices));
            offsets_list.push(Tensor::from_vec(request.offsets));
            if let Some(weights) = request.weights {
                weights_list.push(Tensor::from_vec(weights));
            }
        }

        Ok(Batch {
            indices: Tensor::cat(indices_list),
            offsets: Tensor::cat(offsets_list),
            weights: weighted.then(|| Tensor::cat(weights_list)),
        })
    }
}

fn load_batch(paths: &OverridePaths, device: Device) -> Result<Batch> {
    debug!(
        indices = %paths.indices.display(),
        offsets = %paths.offsets.display(),
        weights = ?paths.weights,
        "Loading override tensors"
    );

    let indices = load_tensor(&paths.indices, device)?;
    let offsets = load_tensor(&paths.offsets, device)?;
    let weights = paths
        .weights
        .as_deref()
        .map(|path| load_tensor(path, device))
        .transpose()?;

    Ok(Batch {
        indices,
        offsets,
        weights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::workload::WeightsInit;
    use crate::tensor::save_tensor;
    use tempfile::TempDir;

    fn builder(seed: u64) -> BatchBuilder {
        BatchBuilder::new(RequestGenerator::with_seed(seed, WeightsInit::Uniform))
    }

    fn tables(rows: &[u64]) -> Vec<TableSpec> {
        rows.iter().map(|&rows| TableSpec { rows, dim: 16 }).collect()
    }

    #[test]
    fn test_two_table_chaining() {
        let mut b = builder(0);
        let batch = b
            .build(
                &tables(&[5, 5]),
                2,
                &[2, 2],
                false,
                0.0,
                &InputSource::Generated,
                Device::Cpu,
            )
            .unwrap();

        assert_eq!(batch.indices.len(), 2 * 2 + 2 * 2);
        // Table 0 ends at 4; table 1's bags start there
        assert_eq!(batch.offsets.as_slice(), &[0, 2, 4, 6, 8]);
        assert_eq!(batch.num_bags(), 4);
        assert!(batch.weights.is_none());
        assert_eq!(b.tables_generated(), 2);
    }

    #[test]
    fn test_empty_leading_table_keeps_single_zero() {
        let mut b = builder(0);
        let batch = b
            .build(
                &tables(&[5, 5]),
                2,
                &[0, 2],
                false,
                0.0,
                &InputSource::Generated,
                Device::Cpu,
            )
            .unwrap();

        // Table 0 contributes two empty bags; table 1 picks up from offset 0
        assert_eq!(batch.offsets.as_slice(), &[0, 0, 0, 2, 4]);
        assert_eq!(batch.num_bags(), 4);
        assert_eq!(batch.indices.len(), 4);
        assert!(batch.validate(4).is_ok());
    }

    #[test]
    fn test_zero_batch_size_offsets() {
        let mut b = builder(0);
        let batch = b
            .build(
                &tables(&[5, 5, 5]),
                0,
                &[2, 2, 2],
                false,
                1.0,
                &InputSource::Generated,
                Device::Cpu,
            )
            .unwrap();

        assert_eq!(batch.offsets.as_slice(), &[0]);
        assert!(batch.indices.is_empty());
    }

    #[test]
    fn test_mixed_pooling_factors() {
        let mut b = builder(3);
        let batch = b
            .build(
                &tables(&[100, 7, 40]),
                4,
                &[3, 1, 5],
                true,
                1.0,
                &InputSource::Generated,
                Device::Cuda(0),
            )
            .unwrap();

        let offsets = batch.offsets.as_slice();
        assert_eq!(offsets.len(), 3 * 4 + 1);
        assert_eq!(offsets[0], 0);
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*offsets.last().unwrap(), batch.indices.len() as i64);
        assert_eq!(batch.indices.len(), 4 * 3 + 4 + 4 * 5);

        // Each table's indices stay within its own rows
        let indices = batch.indices.as_slice();
        assert!(indices[..12].iter().all(|&i| i < 100));
        assert!(indices[12..16].iter().all(|&i| i < 7));
        assert!(indices[16..].iter().all(|&i| i < 40));

        let weights = batch.weights.unwrap();
        assert_eq!(weights.len(), batch.indices.len());
        assert_eq!(weights.device(), Device::Cuda(0));
        assert_eq!(batch.indices.device(), Device::Cuda(0));
    }

    #[test]
    fn test_pooling_count_mismatch() {
        let mut b = builder(0);
        let err = b
            .build(
                &tables(&[5, 5]),
                2,
                &[2],
                false,
                0.0,
                &InputSource::Generated,
                Device::Cpu,
            )
            .unwrap_err();
        assert!(err.to_string().contains("pooling_factor has 1 entries"));
    }

    #[test]
    fn test_loaded_batch_skips_sampling() {
        let dir = TempDir::new().unwrap();
        let indices = dir.path().join("indices.bin");
        let offsets = dir.path().join("offsets.bin");
        let weights = dir.path().join("weights.bin");
        save_tensor(&indices, &Tensor::from_vec(vec![3i64, 1, 4, 1, 5])).unwrap();
        save_tensor(&offsets, &Tensor::from_vec(vec![0i64, 2, 5])).unwrap();
        save_tensor(&weights, &Tensor::from_vec(vec![0.5f32; 5])).unwrap();

        let source = InputSource::Loaded(OverridePaths {
            indices,
            offsets,
            weights: Some(weights),
        });

        let mut b = builder(0);
        let batch = b
            .build(&tables(&[10]), 2, &[3], true, 1.5, &source, Device::Cpu)
            .unwrap();

        assert_eq!(b.tables_generated(), 0);
        assert_eq!(batch.indices.as_slice(), &[3, 1, 4, 1, 5]);
        assert_eq!(batch.offsets.as_slice(), &[0, 2, 5]);
        assert_eq!(batch.weights.unwrap().len(), 5);
    }

    #[test]
    fn test_loaded_batch_validation() {
        let dir = TempDir::new().unwrap();
        let indices = dir.path().join("indices.bin");
        let offsets = dir.path().join("offsets.bin");
        save_tensor(&indices, &Tensor::from_vec(vec![0i64; 4])).unwrap();
        save_tensor(&offsets, &Tensor::from_vec(vec![0i64, 2, 4])).unwrap();
        let source = InputSource::Loaded(OverridePaths {
            indices,
            offsets,
            weights: None,
        });

        // Declared request has 3 bags; the fixture only 2
        let mut permissive = builder(0);
        assert!(permissive
            .build(&tables(&[10]), 3, &[1], false, 1.0, &source, Device::Cpu)
            .is_ok());

        let mut strict = builder(0).with_validation(true);
        assert!(strict
            .build(&tables(&[10]), 3, &[1], false, 1.0, &source, Device::Cpu)
            .is_err());
    }

    #[test]
    fn test_missing_override_file_propagates() {
        let source = InputSource::Loaded(OverridePaths {
            indices: "/nonexistent/indices.bin".into(),
            offsets: "/nonexistent/offsets.bin".into(),
            weights: None,
        });
        let mut b = builder(0);
        let err = b
            .build(&tables(&[10]), 2, &[2], false, 1.0, &source, Device::Cpu)
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/indices.bin"));
        assert_eq!(b.tables_generated(), 0);
    }
}
