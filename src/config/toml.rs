//! Benchmark file parsing and CLI merging

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse a benchmark file
///
/// `.json` files are read as JSON, everything else as TOML.
pub fn parse_config_file(path: &Path) -> Result<BenchConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let parsed = if is_json {
        parse_json_string(&contents)
    } else {
        parse_toml_string(&contents)
    };

    parsed.with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<BenchConfig> {
    let config: BenchConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Parse JSON configuration from string
pub fn parse_json_string(contents: &str) -> Result<BenchConfig> {
    let config: BenchConfig = serde_json::from_str(contents)
        .context("Failed to parse JSON configuration")?;

    Ok(config)
}

/// Merge CLI arguments with file configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: BenchConfig) -> Result<BenchConfig> {
    if let Some(ref device) = cli.device {
        config.run.device = device.clone();
    }
    if let Some(iterations) = cli.iterations {
        config.run.iterations = iterations;
    }
    if let Some(warmup) = cli.warmup {
        config.run.warmup_iterations = warmup;
    }
    if let Some(seed) = cli.seed {
        config.run.seed = Some(seed);
    }
    if let Some(alpha) = cli.alpha {
        config.run.alpha = Some(alpha);
    }
    if cli.no_backward {
        config.run.backward = false;
    }
    if cli.validate_overrides {
        config.run.validate_overrides = true;
    }

    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if cli.pretty {
        config.output.pretty = true;
    }
    if cli.show_percentiles {
        config.output.show_percentiles = true;
    }

    Ok(config)
}
