//! Configuration validation

use super::*;
use crate::iterator::InputIterator;
use crate::tensor::Device;
use anyhow::{Context, Result};
use tracing::warn;

/// Validate complete configuration
pub fn validate_config(config: &BenchConfig) -> Result<()> {
    validate_build(&config.build)?;
    validate_inputs(config)?;
    validate_run(&config.run)?;

    Ok(())
}

/// Validate operator build parameters
pub fn validate_build(build: &BuildConfig) -> Result<()> {
    if build.num_tables == 0 {
        anyhow::bail!("num_tables must be at least 1");
    }

    let rows = build.rows.resolve("rows", build.num_tables)?;
    if let Some(table) = rows.iter().position(|&r| r == 0) {
        anyhow::bail!("table {} has zero rows", table);
    }

    let dims = build.dims.resolve("dims", build.num_tables)?;
    if let Some(table) = dims.iter().position(|&d| d == 0) {
        anyhow::bail!("table {} has zero embedding dimension", table);
    }

    if build.pooling == PoolingMode::None && dims.windows(2).any(|w| w[0] != w[1]) {
        anyhow::bail!("pooling = \"none\" requires every table to have the same dims, got {:?}", dims);
    }

    Ok(())
}

/// Validate input groups by expanding them
pub fn validate_inputs(config: &BenchConfig) -> Result<()> {
    if config.input.is_empty() {
        anyhow::bail!("at least one [[input]] group is required");
    }

    let iter = InputIterator::new(config).context("Invalid [[input]] groups")?;
    if iter.total() == 0 {
        anyhow::bail!("[[input]] groups expand to zero configurations");
    }

    for (id, request) in iter {
        if request.batch_size == 0 {
            warn!(%id, "Config has batch_size 0");
        }
    }

    Ok(())
}

/// Validate execution settings
pub fn validate_run(run: &RunConfig) -> Result<()> {
    run.device
        .parse::<Device>()
        .with_context(|| format!("Invalid device: {}", run.device))?;

    if run.iterations == 0 {
        anyhow::bail!("iterations must be at least 1");
    }

    if let Some(alpha) = run.alpha {
        if !alpha.is_finite() {
            anyhow::bail!("alpha must be a finite number, got {}", alpha);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml::parse_toml_string;
    use crate::error::ConfigError;

    fn config(build: &str, rest: &str) -> BenchConfig {
        parse_toml_string(&format!("[build]\n{}\n{}", build, rest)).unwrap()
    }

    const INPUT: &str = "[[input]]\nargs = [32, 4]\n";

    #[test]
    fn test_valid_config() {
        let cfg = config("num_tables = 2\nrows = 100\ndims = [4, 8]", INPUT);
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_zero_tables() {
        let cfg = config("num_tables = 0\nrows = 100\ndims = 4", INPUT);
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_rows_count_mismatch() {
        let cfg = config("num_tables = 3\nrows = [1, 2]\ndims = 4", INPUT);
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_zero_rows() {
        let cfg = config("num_tables = 2\nrows = [10, 0]\ndims = 4", INPUT);
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_no_inputs() {
        let cfg = config("num_tables = 1\nrows = 10\ndims = 4", "");
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_unknown_device() {
        let cfg = config(
            "num_tables = 1\nrows = 10\ndims = 4",
            &format!("{}\n[run]\ndevice = \"xpu\"\n", INPUT),
        );
        let err = validate_config(&cfg).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnknownDevice("xpu".to_string()))
        );
    }

    #[test]
    fn test_unpooled_needs_uniform_dims() {
        let cfg = config("num_tables = 2\nrows = 10\ndims = [4, 8]\npooling = \"none\"", INPUT);
        assert!(validate_config(&cfg).is_err());
    }
}
