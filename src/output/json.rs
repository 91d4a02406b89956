//! JSON output formatting
//!
//! One report per run: where and when it ran, the operator build block, and
//! forward/backward latency per configuration.

use super::format_duration_human;
use crate::bench::ConfigResult;
use crate::config::{BenchConfig, BuildConfig};
use crate::stats::LatencyHistogram;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

/// Duration with both nanoseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub nanos: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            nanos: u64::try_from(d.as_nanos()).unwrap_or(u64::MAX),
            human: format_duration_human(d),
        }
    }
}

/// Latency statistics with percentiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLatency {
    pub samples: u64,
    pub min: JsonDuration,
    pub mean: JsonDuration,
    pub stddev: JsonDuration,
    pub p50: JsonDuration,
    pub p90: JsonDuration,
    pub p99: JsonDuration,
    pub p99_9: JsonDuration,
    pub max: JsonDuration,
}

impl JsonLatency {
    pub fn from_histogram(hist: &LatencyHistogram) -> Option<Self> {
        let s = hist.summary()?;
        Some(Self {
            samples: s.count,
            min: JsonDuration::from_duration(s.min),
            mean: JsonDuration::from_duration(s.mean),
            stddev: JsonDuration::from_duration(s.stddev),
            p50: JsonDuration::from_duration(s.p50),
            p90: JsonDuration::from_duration(s.p90),
            p99: JsonDuration::from_duration(s.p99),
            p99_9: JsonDuration::from_duration(s.p99_9),
            max: JsonDuration::from_duration(s.max),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRunInfo {
    pub version: String,
    pub hostname: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: JsonDuration,
    pub device: String,
    pub warmup_iterations: usize,
    pub iterations: usize,
    pub backward: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonConfigResult {
    pub id: String,
    pub batch_size: u64,
    pub pooling_factors: Vec<u64>,
    pub num_indices: usize,
    pub rounds_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward: Option<JsonLatency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backward: Option<JsonLatency>,
}

impl From<&ConfigResult> for JsonConfigResult {
    fn from(result: &ConfigResult) -> Self {
        Self {
            id: result.id.clone(),
            batch_size: result.config.batch_size,
            pooling_factors: result.config.pooling_factors.clone(),
            num_indices: result.num_indices,
            rounds_per_sec: result.stats.rounds_per_sec(),
            forward: JsonLatency::from_histogram(&result.stats.forward),
            backward: JsonLatency::from_histogram(&result.stats.backward),
        }
    }
}

/// Complete report file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub run: JsonRunInfo,
    pub build: BuildConfig,
    pub results: Vec<JsonConfigResult>,
}

impl JsonReport {
    pub fn new(
        config: &BenchConfig,
        results: &[ConfigResult],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok());
        let duration = (end_time - start_time).to_std().unwrap_or_default();

        Self {
            run: JsonRunInfo {
                version: env!("CARGO_PKG_VERSION").to_string(),
                hostname,
                start_time,
                end_time,
                duration: JsonDuration::from_duration(duration),
                device: config.run.device.clone(),
                warmup_iterations: config.run.warmup_iterations,
                iterations: config.run.iterations,
                backward: config.run.backward,
                seed: config.run.seed,
            },
            build: config.build.clone(),
            results: results.iter().map(JsonConfigResult::from).collect(),
        }
    }
}

pub fn write_json_output(output_path: &Path, report: &JsonReport, pretty: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;
    let writer = BufWriter::new(file);

    if pretty {
        serde_json::to_writer_pretty(writer, report)?;
    } else {
        serde_json::to_writer(writer, report)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml::parse_toml_string;
    use crate::request::RequestConfig;
    use crate::stats::PassStats;
    use tempfile::TempDir;

    fn sample() -> (BenchConfig, Vec<ConfigResult>) {
        let config = parse_toml_string(
            "[build]\nnum_tables = 1\nrows = 100\ndims = 8\n\n[[input]]\nargs = [4, 2]\n",
        )
        .unwrap();
        let (id, request): (String, RequestConfig) = crate::iterator::InputIterator::new(&config)
            .unwrap()
            .next()
            .unwrap();

        let mut stats = PassStats::new().unwrap();
        stats.forward.record(Duration::from_micros(120));
        stats.forward.record(Duration::from_micros(80));
        stats.elapsed = Duration::from_millis(1);

        let result = ConfigResult {
            id,
            config: request,
            num_indices: 8,
            stats,
        };
        (config, vec![result])
    }

    #[test]
    fn test_report_contents() {
        let (config, results) = sample();
        let now = Utc::now();
        let report = JsonReport::new(&config, &results, now, now);

        assert_eq!(report.results.len(), 1);
        let entry = &report.results[0];
        assert_eq!(entry.id, "0_0");
        assert_eq!(entry.batch_size, 4);
        assert_eq!(entry.forward.as_ref().unwrap().samples, 2);
        assert!(entry.backward.is_none());
        assert_eq!(report.run.duration.nanos, 0);
    }

    #[test]
    fn test_write_json_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let (config, results) = sample();
        let now = Utc::now();

        write_json_output(&path, &JsonReport::new(&config, &results, now, now), true).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["results"][0]["pooling_factors"], serde_json::json!([2]));
        assert_eq!(value["build"]["num_tables"], 1);
        assert!(value["results"][0].get("backward").is_none());
    }
}
