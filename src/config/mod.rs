//! Configuration module
//!
//! Handles CLI argument parsing, TOML/JSON benchmark files, and validation.
//!
//! A benchmark file has four blocks:
//!
//! ```toml
//! [build]                     # operator shape, fixed for every iteration
//! num_tables = 2
//! rows = [100000, 50000]
//! dims = [128, 64]
//! weighted = true
//!
//! [[input]]                   # one group per declared input set
//! args = [{ __list__ = [32, 64] }, { __range__ = [4, 8, 4] }]
//!
//! [run]
//! device = "cpu"
//! iterations = 20
//!
//! [output]
//! json_output = "results.json"
//! ```

pub mod cli;
pub mod toml;
pub mod validator;
pub mod workload;

use crate::iterator::axis::{AxisArg, AxisValue};
use crate::request::source::TensorOverrides;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use workload::*;

/// Complete benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    pub build: BuildConfig,
    #[serde(default)]
    pub input: Vec<InputGroup>,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Operator build parameters
///
/// Read either by name or as a positional list:
/// `{ args = [num_tables, rows, dims, _, _, weighted, weights_precision, optimizer] }`.
/// Positions 3 and 4 stand in for the batch size and pooling factor axes and
/// are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "BuildSpec")]
pub struct BuildConfig {
    pub num_tables: usize,
    /// Rows per table (one value for all tables, or a per-table list)
    pub rows: AxisValue,
    /// Embedding dimension per table
    pub dims: AxisValue,
    pub location: EmbeddingLocation,
    pub pooling: PoolingMode,
    pub weighted: bool,
    pub weights_precision: SparseType,
    pub optimizer: OptimType,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BuildSpec {
    Positional {
        args: (
            usize,
            AxisValue,
            AxisValue,
            IgnoredAny,
            IgnoredAny,
            bool,
            SparseType,
            OptimType,
        ),
        #[serde(default)]
        location: EmbeddingLocation,
        #[serde(default)]
        pooling: PoolingMode,
    },
    Named {
        num_tables: usize,
        rows: AxisValue,
        dims: AxisValue,
        #[serde(default)]
        location: EmbeddingLocation,
        #[serde(default)]
        pooling: PoolingMode,
        #[serde(default)]
        weighted: bool,
        #[serde(default)]
        weights_precision: SparseType,
        #[serde(default)]
        optimizer: OptimType,
    },
}

impl From<BuildSpec> for BuildConfig {
    fn from(spec: BuildSpec) -> Self {
        match spec {
            BuildSpec::Positional {
                args: (num_tables, rows, dims, _, _, weighted, weights_precision, optimizer),
                location,
                pooling,
            } => Self {
                num_tables,
                rows,
                dims,
                location,
                pooling,
                weighted,
                weights_precision,
                optimizer,
            },
            BuildSpec::Named {
                num_tables,
                rows,
                dims,
                location,
                pooling,
                weighted,
                weights_precision,
                optimizer,
            } => Self {
                num_tables,
                rows,
                dims,
                location,
                pooling,
                weighted,
                weights_precision,
                optimizer,
            },
        }
    }
}

/// One declared input group
///
/// `args` holds the batch size axis and the pooling factor axis, in that
/// order. Tensor paths switch the group to override mode; they may sit on
/// the group itself or on the pooling factor axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputGroup {
    pub args: Vec<AxisArg>,
    #[serde(flatten)]
    pub overrides: TensorOverrides,
}

impl InputGroup {
    /// Group-level paths, each falling back to the one on the pooling factor axis
    pub fn tensor_overrides(&self) -> TensorOverrides {
        let axis = self
            .args
            .get(1)
            .and_then(AxisArg::overrides)
            .cloned()
            .unwrap_or_default();
        TensorOverrides {
            indices_tensor: self.overrides.indices_tensor.clone().or(axis.indices_tensor),
            offsets_tensor: self.overrides.offsets_tensor.clone().or(axis.offsets_tensor),
            weights_tensor: self.overrides.weights_tensor.clone().or(axis.weights_tensor),
        }
    }
}

/// Execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Compute device (`cpu`, `cuda`, `cuda:<n>`)
    #[serde(default = "default_device")]
    pub device: String,
    /// Untimed forward/backward rounds per configuration
    #[serde(default = "default_warmup_iterations")]
    pub warmup_iterations: usize,
    /// Timed forward/backward rounds per configuration
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Seed for every random draw; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
    /// Skew override; `split_embedding_distribution` is used when unset
    #[serde(default)]
    pub alpha: Option<f64>,
    /// Run the backward pass after each forward
    #[serde(default = "default_backward")]
    pub backward: bool,
    /// Check override tensors against the declared request shape
    #[serde(default)]
    pub validate_overrides: bool,
    /// Per-sample weights distribution
    #[serde(default)]
    pub weights_init: WeightsInit,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_warmup_iterations() -> usize {
    1
}

fn default_iterations() -> usize {
    10
}

fn default_backward() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            warmup_iterations: default_warmup_iterations(),
            iterations: default_iterations(),
            seed: None,
            alpha: None,
            backward: default_backward(),
            validate_overrides: false,
            weights_init: WeightsInit::default(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report path
    pub json_output: Option<PathBuf>,
    /// Pretty-print the JSON report
    #[serde(default)]
    pub pretty: bool,
    /// Print p90/p99/p99.9 in the text report
    #[serde(default)]
    pub show_percentiles: bool,
}
