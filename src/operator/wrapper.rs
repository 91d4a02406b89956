//! Benchmark-facing operator wrapper

use super::{ComputeDevice, EmbeddingBagOperator, KernelFactory, OperatorSpec};
use crate::config::BuildConfig;
use crate::request::Batch;
use crate::tensor::{Device, Tensor};
use crate::Result;
use anyhow::Context;
use tracing::debug;

/// Split-table batched embedding bag operator as seen by the bench loop
///
/// Holds the built kernel plus the forward output and gradient between
/// `forward` and `backward`. Calls must follow build -> forward ->
/// create_grad -> backward; anything else is an error.
pub struct SplitTableBatchedEmbeddingOp {
    device: String,
    factory: KernelFactory,
    target: Option<Device>,
    op: Option<Box<dyn EmbeddingBagOperator>>,
    fwd_out: Option<Tensor<f32>>,
    grad_in: Option<Tensor<f32>>,
}

impl SplitTableBatchedEmbeddingOp {
    pub fn new(device: impl Into<String>, factory: KernelFactory) -> Self {
        Self {
            device: device.into(),
            factory,
            target: None,
            op: None,
            fwd_out: None,
            grad_in: None,
        }
    }

    /// Build the kernel for the `[build]` block
    ///
    /// Fails with [`crate::error::ConfigError::UnknownDevice`] unless the
    /// wrapper's device string starts with `cpu` or `cuda`.
    pub fn build(&mut self, build: &BuildConfig) -> Result<()> {
        debug!(
            num_tables = build.num_tables,
            rows = %build.rows,
            dims = %build.dims,
            location = %build.location,
            pooling = %build.pooling,
            weighted = build.weighted,
            weights_precision = %build.weights_precision,
            optimizer = %build.optimizer,
            "Op build"
        );

        let target: Device = self.device.parse()?;
        let spec = OperatorSpec {
            num_tables: build.num_tables,
            rows: build.rows.resolve("rows", build.num_tables)?,
            dims: build.dims.resolve("dims", build.num_tables)?,
            location: build.location,
            pooling: build.pooling,
            weighted: build.weighted,
            weights_precision: build.weights_precision,
            optimizer: build.optimizer,
            compute_device: ComputeDevice::from(target),
        };

        let op = (self.factory)(&spec)
            .with_context(|| format!("Failed to build operator on {}", self.device))?;
        debug!(op = op.name(), ?spec, "Op built");

        self.cleanup();
        self.target = Some(target);
        self.op = Some(op);
        Ok(())
    }

    pub fn forward(&mut self, batch: &Batch) -> Result<()> {
        let op = self
            .op
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("forward called before build"))?;
        self.fwd_out = Some(op.forward(&batch.indices, &batch.offsets, batch.weights.as_ref())?);
        Ok(())
    }

    /// Ones-like gradient of the last forward output
    pub fn create_grad(&mut self) -> Result<()> {
        let out = self
            .fwd_out
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("create_grad called before forward"))?;
        let device = self.target.unwrap_or_default();
        self.grad_in = Some(out.ones_like().to(device));
        Ok(())
    }

    /// Run backward and release the retained output and gradient
    pub fn backward(&mut self) -> Result<()> {
        let op = self
            .op
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("backward called before build"))?;
        let grad = self
            .grad_in
            .take()
            .ok_or_else(|| anyhow::anyhow!("backward called before create_grad"))?;
        op.backward(&grad)?;
        self.fwd_out = None;
        Ok(())
    }

    /// Drop the kernel and every retained buffer
    pub fn cleanup(&mut self) {
        debug!("Op cleanup");
        self.op = None;
        self.grad_in = None;
        self.fwd_out = None;
        self.target = None;
    }

    pub fn is_built(&self) -> bool {
        self.op.is_some()
    }

    pub fn output(&self) -> Option<&Tensor<f32>> {
        self.fwd_out.as_ref()
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}
