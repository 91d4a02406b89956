//! Human-readable text output

use super::format_duration_human;
use crate::bench::ConfigResult;
use crate::stats::LatencyHistogram;

/// Print the per-configuration results table
pub fn print_results(results: &[ConfigResult], show_percentiles: bool) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    BENCHMARK RESULTS");
    println!("═══════════════════════════════════════════════════════════");

    for result in results {
        println!();
        println!(
            "Config {}: batch_size={} pooling_factors={:?} indices={}",
            result.id,
            result.config.batch_size,
            result.config.pooling_factors,
            result.num_indices
        );
        print_pass("Forward", &result.stats.forward, show_percentiles);
        print_pass("Backward", &result.stats.backward, show_percentiles);
        println!(
            "  Rounds:   {} in {:.3}s ({:.1}/s)",
            result.stats.forward.len(),
            result.stats.elapsed.as_secs_f64(),
            result.stats.rounds_per_sec()
        );
    }

    println!();
}

fn print_pass(label: &str, hist: &LatencyHistogram, show_percentiles: bool) {
    let Some(summary) = hist.summary() else {
        println!("  {:<9} skipped", format!("{}:", label));
        return;
    };

    println!(
        "  {:<9} mean {}  p50 {}  p99 {}",
        format!("{}:", label),
        format_duration_human(summary.mean),
        format_duration_human(summary.p50),
        format_duration_human(summary.p99)
    );
    if show_percentiles {
        println!(
            "            min {}  p90 {}  p99.9 {}  max {}",
            format_duration_human(summary.min),
            format_duration_human(summary.p90),
            format_duration_human(summary.p99_9),
            format_duration_human(summary.max)
        );
    }
}
