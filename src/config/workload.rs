//! Operator and workload enums shared by configuration, requests and operators

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where embedding table weights live
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingLocation {
    Device,
    Managed,
    ManagedCaching,
    Host,
}

impl Default for EmbeddingLocation {
    fn default() -> Self {
        Self::Device
    }
}

/// Reduction applied to each bag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PoolingMode {
    Sum,
    Mean,
    /// No reduction, one output row per index
    None,
}

impl Default for PoolingMode {
    fn default() -> Self {
        Self::Sum
    }
}

/// Storage precision of embedding weights
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SparseType {
    Fp32,
    Fp16,
    Int8,
}

impl Default for SparseType {
    fn default() -> Self {
        Self::Fp32
    }
}

/// Optimizer fused into the backward pass
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimType {
    Sgd,
    ExactSgd,
    ExactAdagrad,
    ExactRowWiseAdagrad,
}

impl Default for OptimType {
    fn default() -> Self {
        Self::ExactSgd
    }
}

/// How per-sample weights are drawn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightsInit {
    /// Uniform in `[0, 1)`
    Uniform,
    /// Standard normal
    Normal,
}

impl Default for WeightsInit {
    fn default() -> Self {
        Self::Uniform
    }
}

impl fmt::Display for EmbeddingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingLocation::Device => write!(f, "device"),
            EmbeddingLocation::Managed => write!(f, "managed"),
            EmbeddingLocation::ManagedCaching => write!(f, "managed_caching"),
            EmbeddingLocation::Host => write!(f, "host"),
        }
    }
}

impl fmt::Display for PoolingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolingMode::Sum => write!(f, "sum"),
            PoolingMode::Mean => write!(f, "mean"),
            PoolingMode::None => write!(f, "none"),
        }
    }
}

impl fmt::Display for SparseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SparseType::Fp32 => write!(f, "fp32"),
            SparseType::Fp16 => write!(f, "fp16"),
            SparseType::Int8 => write!(f, "int8"),
        }
    }
}

impl fmt::Display for OptimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimType::Sgd => write!(f, "sgd"),
            OptimType::ExactSgd => write!(f, "exact_sgd"),
            OptimType::ExactAdagrad => write!(f, "exact_adagrad"),
            OptimType::ExactRowWiseAdagrad => write!(f, "exact_row_wise_adagrad"),
        }
    }
}

impl fmt::Display for WeightsInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightsInit::Uniform => write!(f, "uniform"),
            WeightsInit::Normal => write!(f, "normal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        optimizer: OptimType,
        location: EmbeddingLocation,
    }

    #[test]
    fn test_snake_case_names() {
        let holder: Holder =
            ::toml::from_str("optimizer = \"exact_row_wise_adagrad\"\nlocation = \"managed_caching\"")
                .unwrap();
        assert_eq!(holder.optimizer, OptimType::ExactRowWiseAdagrad);
        assert_eq!(holder.location, EmbeddingLocation::ManagedCaching);
        assert_eq!(holder.optimizer.to_string(), "exact_row_wise_adagrad");
    }
}
