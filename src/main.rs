//! EmbPulse CLI entry point

use anyhow::{Context, Result};
use embpulse::bench::{generate_fixtures, list_configs, BenchRunner};
use embpulse::config::cli::{Cli, ExecutionMode};
use embpulse::config::toml::{merge_cli_with_config, parse_config_file};
use embpulse::config::validator::validate_config;
use embpulse::config::BenchConfig;
use embpulse::output::json::{write_json_output, JsonReport};
use embpulse::output::text::print_results;
use embpulse::registry::Registry;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug)?;
    cli.validate()?;

    println!("EmbPulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Embedding-bag lookup benchmark");
    println!();

    let config = parse_config_file(&cli.config)?;
    let config = merge_cli_with_config(&cli, config)?;
    validate_config(&config).context("Configuration validation failed")?;

    print_configuration(&config);

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let registry = Registry::global();
    match cli.mode {
        ExecutionMode::Run => run_benchmark(&config, registry),
        ExecutionMode::Generate => {
            let files = generate_fixtures(&config, registry, &cli.out_dir)?;
            println!();
            for file in files {
                println!("Wrote {}", file.display());
            }
            Ok(())
        }
        ExecutionMode::List => print_listing(&config, registry),
    }
}

/// `RUST_LOG` wins unless `--debug` is given
fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("embpulse=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("embpulse=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to install log subscriber")?;
    Ok(())
}

fn run_benchmark(config: &BenchConfig, registry: &Registry) -> Result<()> {
    println!();
    println!("Starting benchmark...");

    let start_time = chrono::Utc::now();
    let results = BenchRunner::new(config, registry).run()?;
    let end_time = chrono::Utc::now();

    println!();
    print_results(&results, config.output.show_percentiles);

    if let Some(ref path) = config.output.json_output {
        let report = JsonReport::new(config, &results, start_time, end_time);
        write_json_output(path, &report, config.output.pretty)?;
        println!("JSON report written to {}", path.display());
    }

    Ok(())
}

fn print_listing(config: &BenchConfig, registry: &Registry) -> Result<()> {
    println!();
    println!("Registered:");
    for (kind, name) in registry.names() {
        println!("  {:<15} {}", kind, name);
    }

    println!();
    println!("Configurations:");
    for (id, request) in list_configs(config, registry)? {
        println!(
            "  {:<8} batch_size={} pooling_factors={:?} indices={}",
            id,
            request.batch_size,
            request.pooling_factors,
            request.num_indices()
        );
    }
    Ok(())
}

fn print_configuration(config: &BenchConfig) {
    let build = &config.build;
    println!("Configuration:");
    println!("  Build:");
    println!("    Tables: {}", build.num_tables);
    println!("    Rows: {}", build.rows);
    println!("    Dims: {}", build.dims);
    println!("    Location: {}, Pooling: {}", build.location, build.pooling);
    println!(
        "    Weighted: {}, Precision: {}, Optimizer: {}",
        build.weighted, build.weights_precision, build.optimizer
    );

    let run = &config.run;
    println!("  Run:");
    println!("    Device: {}", run.device);
    println!(
        "    Iterations: {} (+{} warmup), Backward: {}",
        run.iterations, run.warmup_iterations, run.backward
    );
    if let Some(seed) = run.seed {
        println!("    Seed: {}", seed);
    }
    if let Some(alpha) = run.alpha {
        println!("    Alpha: {}", alpha);
    }

    println!("  Inputs: {} group(s)", config.input.len());
}
