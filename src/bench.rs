//! Benchmark loop
//!
//! For every `(id, config)` the input iterator yields, the runner prepares
//! the batch, builds the operator, runs the untimed warmup rounds, then the
//! timed rounds, and cleans the operator up before moving on.

use crate::config::BenchConfig;
use crate::operator::wrapper::SplitTableBatchedEmbeddingOp;
use crate::registry::{Registry, DATA_GENERATOR, INPUT_ITERATOR, OPERATOR};
use crate::request::{Batch, RequestConfig};
use crate::stats::PassStats;
use crate::tensor::{save_tensor, Device};
use crate::Result;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Measurements of one configuration
#[derive(Debug, Clone)]
pub struct ConfigResult {
    pub id: String,
    pub config: RequestConfig,
    pub num_indices: usize,
    pub stats: PassStats,
}

pub struct BenchRunner<'a> {
    config: &'a BenchConfig,
    registry: &'a Registry,
}

impl<'a> BenchRunner<'a> {
    pub fn new(config: &'a BenchConfig, registry: &'a Registry) -> Self {
        Self { config, registry }
    }

    /// Run every configuration in order
    ///
    /// The first failing configuration aborts the run.
    pub fn run(&self) -> Result<Vec<ConfigResult>> {
        let run = &self.config.run;
        let device: Device = run.device.parse()?;

        let configs = (self.registry.iterator(INPUT_ITERATOR)?)(self.config)?;
        let mut generator = (self.registry.generator(DATA_GENERATOR)?)(run);
        let mut op = SplitTableBatchedEmbeddingOp::new(run.device.clone(), self.registry.operator(OPERATOR)?);

        let mut results = Vec::new();
        for (id, request) in configs {
            info!(
                %id,
                batch_size = request.batch_size,
                pooling_factors = ?request.pooling_factors,
                "Running config"
            );

            let batch = generator
                .get_data(&request, device)
                .with_context(|| format!("Failed to prepare inputs for config {}", id))?;
            debug!(
                indices = ?batch.indices.shape(),
                offsets = ?batch.offsets.shape(),
                "Batch ready"
            );

            op.build(&self.config.build)
                .with_context(|| format!("Failed to build operator for config {}", id))?;
            let measured = self.measure(&mut op, &batch);
            op.cleanup();
            let stats = measured.with_context(|| format!("Config {} failed", id))?;

            results.push(ConfigResult {
                id,
                num_indices: batch.indices.len(),
                config: request,
                stats,
            });
        }

        Ok(results)
    }

    fn measure(&self, op: &mut SplitTableBatchedEmbeddingOp, batch: &Batch) -> Result<PassStats> {
        let run = &self.config.run;

        for _ in 0..run.warmup_iterations {
            op.forward(batch)?;
            if run.backward {
                op.create_grad()?;
                op.backward()?;
            }
        }

        let mut stats = PassStats::new()?;
        let start = Instant::now();
        for _ in 0..run.iterations {
            let t = Instant::now();
            op.forward(batch)?;
            stats.forward.record(t.elapsed());

            if run.backward {
                op.create_grad()?;
                let t = Instant::now();
                op.backward()?;
                stats.backward.record(t.elapsed());
            }
        }
        stats.elapsed = start.elapsed();

        Ok(stats)
    }
}

/// Every configuration the registered input iterator yields, in order
pub fn list_configs(config: &BenchConfig, registry: &Registry) -> Result<Vec<(String, RequestConfig)>> {
    Ok((registry.iterator(INPUT_ITERATOR)?)(config)?.collect())
}

/// Write the first configuration's batch as replayable tensor files
///
/// Produces `indices.bin` and `offsets.bin`, plus `weights.bin` for weighted
/// builds, under `out_dir`. Point `indices_tensor`/`offsets_tensor` (or the
/// `split_embedding_*` variables) at them to replay the batch.
pub fn generate_fixtures(config: &BenchConfig, registry: &Registry, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let (id, request) = (registry.iterator(INPUT_ITERATOR)?)(config)?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No input configuration to generate"))?;
    let mut generator = (registry.generator(DATA_GENERATOR)?)(&config.run);
    let batch = generator.get_data(&request, Device::Cpu)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut written = vec![out_dir.join("indices.bin"), out_dir.join("offsets.bin")];
    save_tensor(&written[0], &batch.indices)?;
    save_tensor(&written[1], &batch.offsets)?;
    if let Some(weights) = &batch.weights {
        let path = out_dir.join("weights.bin");
        save_tensor(&path, weights)?;
        written.push(path);
    }

    info!(%id, files = written.len(), dir = %out_dir.display(), "Fixtures written");
    Ok(written)
}
