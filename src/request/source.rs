//! Where a request batch comes from
//!
//! A batch is either generated from the configured distribution or loaded
//! from precomputed tensor files. The choice is made once per configuration
//! by [`InputSource::resolve`]: explicit paths on the input group win, then the
//! `split_embedding_*` environment variables. Both an indices and an offsets
//! path are required for loading; anything less falls back to generation.

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Skew parameter of the generated distribution
pub const ENV_DISTRIBUTION: &str = "split_embedding_distribution";
/// Path of a precomputed indices tensor
pub const ENV_INDICES: &str = "split_embedding_indices";
/// Path of a precomputed offsets tensor
pub const ENV_OFFSETS: &str = "split_embedding_offsets";
/// Path of precomputed per-sample weights
pub const ENV_WEIGHTS: &str = "split_embedding_weights";

/// Skew used when nothing else is configured (uniform)
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Explicit tensor file paths attached to the pooling factor axis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices_tensor: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets_tensor: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights_tensor: Option<PathBuf>,
}

/// Resolved tensor files for override mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverridePaths {
    pub indices: PathBuf,
    pub offsets: PathBuf,
    pub weights: Option<PathBuf>,
}

/// Origin of a request batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Generated,
    Loaded(OverridePaths),
}

impl InputSource {
    /// Pick the source for one configuration
    ///
    /// The weights path is only consulted for weighted requests.
    pub fn resolve(overrides: &TensorOverrides, weighted: bool, env: &dyn EnvLookup) -> Self {
        let (indices, offsets, weights) = match (&overrides.indices_tensor, &overrides.offsets_tensor) {
            (Some(indices), Some(offsets)) => (
                Some(indices.clone()),
                Some(offsets.clone()),
                overrides.weights_tensor.clone().filter(|_| weighted),
            ),
            _ => (
                env.var(ENV_INDICES).map(PathBuf::from),
                env.var(ENV_OFFSETS).map(PathBuf::from),
                env.var(ENV_WEIGHTS).map(PathBuf::from).filter(|_| weighted),
            ),
        };

        match (indices, offsets) {
            (Some(indices), Some(offsets)) => InputSource::Loaded(OverridePaths {
                indices,
                offsets,
                weights,
            }),
            _ => InputSource::Generated,
        }
    }
}

/// Read access to environment variables
pub trait EnvLookup {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Skew parameter from the environment, [`DEFAULT_ALPHA`] when unset
pub fn distribution_alpha(env: &dyn EnvLookup) -> Result<f64> {
    match env.var(ENV_DISTRIBUTION) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value: {}", ENV_DISTRIBUTION, value)),
        None => Ok(DEFAULT_ALPHA),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_generated_by_default() {
        let source = InputSource::resolve(&TensorOverrides::default(), true, &env(&[]));
        assert_eq!(source, InputSource::Generated);
    }

    #[test]
    fn test_resolve_explicit_paths() {
        let overrides = TensorOverrides {
            indices_tensor: Some("i.bin".into()),
            offsets_tensor: Some("o.bin".into()),
            weights_tensor: Some("w.bin".into()),
        };
        let env = env(&[(ENV_INDICES, "env_i.bin"), (ENV_OFFSETS, "env_o.bin")]);

        match InputSource::resolve(&overrides, true, &env) {
            InputSource::Loaded(paths) => {
                assert_eq!(paths.indices, PathBuf::from("i.bin"));
                assert_eq!(paths.offsets, PathBuf::from("o.bin"));
                assert_eq!(paths.weights, Some(PathBuf::from("w.bin")));
            }
            other => panic!("Expected loaded source, got {:?}", other),
        }

        match InputSource::resolve(&overrides, false, &env) {
            InputSource::Loaded(paths) => assert_eq!(paths.weights, None),
            other => panic!("Expected loaded source, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_env_fallback() {
        // Indices alone on the group is not enough; the environment is used instead
        let overrides = TensorOverrides {
            indices_tensor: Some("i.bin".into()),
            ..Default::default()
        };
        let env = env(&[
            (ENV_INDICES, "env_i.bin"),
            (ENV_OFFSETS, "env_o.bin"),
            (ENV_WEIGHTS, "env_w.bin"),
        ]);

        match InputSource::resolve(&overrides, true, &env) {
            InputSource::Loaded(paths) => {
                assert_eq!(paths.indices, PathBuf::from("env_i.bin"));
                assert_eq!(paths.weights, Some(PathBuf::from("env_w.bin")));
            }
            other => panic!("Expected loaded source, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_needs_offsets() {
        let env = env(&[(ENV_INDICES, "env_i.bin")]);
        let source = InputSource::resolve(&TensorOverrides::default(), false, &env);
        assert_eq!(source, InputSource::Generated);
    }

    #[test]
    fn test_distribution_alpha() {
        assert_eq!(distribution_alpha(&env(&[])).unwrap(), 1.0);
        assert_eq!(
            distribution_alpha(&env(&[(ENV_DISTRIBUTION, "1.15")])).unwrap(),
            1.15
        );
        assert!(distribution_alpha(&env(&[(ENV_DISTRIBUTION, "skewed")])).is_err());
    }
}
