//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Run the benchmark (default)
    Run,
    /// Write the first configuration's batch as override fixtures
    Generate,
    /// Print the expanded configurations and exit
    List,
}

/// EmbPulse - embedding-bag lookup benchmark
#[derive(Parser, Debug)]
#[command(name = "embpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Benchmark file (TOML, or JSON with a .json extension)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Execution mode: run, generate, or list
    #[arg(long, value_enum, default_value = "run")]
    pub mode: ExecutionMode,

    /// Output directory for generated fixtures (generate mode)
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    // === Run Options ===
    /// Compute device (cpu, cuda, cuda:N)
    #[arg(long)]
    pub device: Option<String>,

    /// Timed iterations per configuration
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Warmup iterations per configuration
    #[arg(short = 'w', long)]
    pub warmup: Option<usize>,

    /// Seed for reproducible requests
    #[arg(long)]
    pub seed: Option<u64>,

    /// Index distribution skew (0: linear by pooling, <=0.5: linear, <=1: uniform, >1: zipf)
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Skip the backward pass
    #[arg(long)]
    pub no_backward: bool,

    /// Check loaded override tensors against the declared request shape
    #[arg(long)]
    pub validate_overrides: bool,

    // === Output Options ===
    /// Write a JSON report to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,

    /// Show tail percentiles in the text report
    #[arg(long)]
    pub show_percentiles: bool,

    // === Misc ===
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long)]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.iterations == Some(0) {
            anyhow::bail!("--iterations must be at least 1");
        }
        if let Some(alpha) = self.alpha {
            if !alpha.is_finite() {
                anyhow::bail!("--alpha must be a finite number, got {}", alpha);
            }
        }
        Ok(())
    }
}
