//! Embedding-bag operator abstraction
//!
//! The operator is the thing being benchmarked: a batched embedding-bag kernel
//! over several tables that pools the rows named by each bag into one output
//! vector, and applies a fused optimizer step on backward. This crate does not
//! own a production kernel; it drives whatever [`EmbeddingBagOperator`] the
//! registered [`KernelFactory`] builds.
//!
//! # Lifecycle
//!
//! The [`wrapper::SplitTableBatchedEmbeddingOp`] wrapper sequences the calls:
//!
//! 1. `build()` resolves the table list and compute device, then constructs
//!    the kernel through the factory
//! 2. `forward()` runs one batch and keeps the output
//! 3. `create_grad()` allocates a ones-like gradient on the target device
//! 4. `backward()` consumes the gradient and releases the retained output
//! 5. `cleanup()` drops the kernel and any retained buffers
//!
//! # Implementations
//!
//! - [`reference::ReferenceOperator`]: naive host kernel (sum/mean pooling,
//!   SGD and Adagrad variants), used by the CLI
//! - [`mock::MockOperator`]: records calls for tests

pub mod mock;
pub mod reference;
pub mod wrapper;

use crate::config::workload::{EmbeddingLocation, OptimType, PoolingMode, SparseType};
use crate::tensor::{Device, Tensor};
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Compute device family the kernel targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cpu,
    Cuda,
}

impl From<Device> for ComputeDevice {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => ComputeDevice::Cpu,
            Device::Cuda(_) => ComputeDevice::Cuda,
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Cpu => write!(f, "cpu"),
            ComputeDevice::Cuda => write!(f, "cuda"),
        }
    }
}

/// Fully resolved kernel parameters
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorSpec {
    pub num_tables: usize,
    pub rows: Vec<u64>,
    pub dims: Vec<u64>,
    pub location: EmbeddingLocation,
    pub pooling: PoolingMode,
    pub weighted: bool,
    pub weights_precision: SparseType,
    pub optimizer: OptimType,
    pub compute_device: ComputeDevice,
}

impl OperatorSpec {
    /// Width of one output row (sum of table dims)
    pub fn total_dim(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).sum()
    }
}

/// Batched embedding-bag kernel
pub trait EmbeddingBagOperator: Send {
    /// Pool one batch
    ///
    /// Returns `[batch_size, total_dim]` for pooled modes, with table `t`
    /// occupying columns `sum(dims[..t])..sum(dims[..=t])`.
    fn forward(
        &mut self,
        indices: &Tensor<i64>,
        offsets: &Tensor<i64>,
        weights: Option<&Tensor<f32>>,
    ) -> Result<Tensor<f32>>;

    /// Apply the gradient of the last forward output
    fn backward(&mut self, grad: &Tensor<f32>) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Builds a kernel from its spec
pub type KernelFactory =
    Arc<dyn Fn(&OperatorSpec) -> Result<Box<dyn EmbeddingBagOperator>> + Send + Sync>;
