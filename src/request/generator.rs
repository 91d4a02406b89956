//! Per-configuration data generation entry point

use super::builder::BatchBuilder;
use super::source::{distribution_alpha, EnvLookup, InputSource, ProcessEnv};
use super::{Batch, RequestConfig, RequestGenerator};
use crate::config::RunConfig;
use crate::tensor::Device;
use crate::Result;
use tracing::debug;

/// Produces the operator inputs for one configuration
pub trait DataGenerator {
    fn get_data(&mut self, config: &RequestConfig, device: Device) -> Result<Batch>;
}

/// Generator for split-table batched embedding bag requests
///
/// Resolves the skew (run config, then `split_embedding_distribution`, then
/// uniform) and the [`InputSource`] for every configuration, then hands off to
/// the [`BatchBuilder`].
pub struct SplitTableInputDataGenerator {
    builder: BatchBuilder,
    env: Box<dyn EnvLookup + Send>,
    alpha: Option<f64>,
}

impl SplitTableInputDataGenerator {
    /// Generator reading overrides from the process environment
    pub fn new(run: &RunConfig) -> Self {
        Self::with_env(run, Box::new(ProcessEnv))
    }

    pub fn with_env(run: &RunConfig, env: Box<dyn EnvLookup + Send>) -> Self {
        let generator = match run.seed {
            Some(seed) => RequestGenerator::with_seed(seed, run.weights_init),
            None => RequestGenerator::new(run.weights_init),
        };

        Self {
            builder: BatchBuilder::new(generator).with_validation(run.validate_overrides),
            env,
            alpha: run.alpha,
        }
    }

    pub fn tables_generated(&self) -> u64 {
        self.builder.tables_generated()
    }
}

impl DataGenerator for SplitTableInputDataGenerator {
    fn get_data(&mut self, config: &RequestConfig, device: Device) -> Result<Batch> {
        debug!(?config, "Generating data");

        let alpha = match self.alpha {
            Some(alpha) => alpha,
            None => distribution_alpha(self.env.as_ref())?,
        };
        debug!(alpha, "Index distribution");

        let source = InputSource::resolve(&config.overrides, config.weighted, self.env.as_ref());
        debug!(?source, "Input source");

        self.builder.build(
            &config.tables(),
            config.batch_size,
            &config.pooling_factors,
            config.weighted,
            alpha,
            &source,
            device,
        )
    }
}
