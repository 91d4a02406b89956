//! Latency histogram using HdrHistogram
//!
//! Forward and backward timings are recorded in nanoseconds, from 1ns up to
//! one hour, with 3 significant digits.
//!
//! # Example
//!
//! ```
//! use embpulse::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let mut hist = LatencyHistogram::new().unwrap();
//! hist.record(Duration::from_micros(100));
//! hist.record(Duration::from_micros(200));
//!
//! assert_eq!(hist.len(), 2);
//! assert!(hist.percentile(50.0).is_some());
//! ```

use super::LatencySummary;
use crate::Result;
use hdrhistogram::Histogram;
use std::time::Duration;

const MAX_NANOS: u64 = 3_600_000_000_000;

#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    pub fn new() -> Result<Self> {
        let histogram = Histogram::new_with_bounds(1, MAX_NANOS, 3)
            .map_err(|e| anyhow::anyhow!("Failed to create latency histogram: {}", e))?;
        Ok(Self { histogram })
    }

    /// Record one sample, clamped to the tracked range
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(MAX_NANOS);
        self.histogram.saturating_record(nanos.clamp(1, MAX_NANOS));
    }

    /// Latency at `percentile` (0.0 - 100.0), `None` when empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        self.non_empty()
            .map(|h| Duration::from_nanos(h.value_at_percentile(percentile)))
    }

    pub fn min(&self) -> Option<Duration> {
        self.non_empty().map(|h| Duration::from_nanos(h.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        self.non_empty().map(|h| Duration::from_nanos(h.max()))
    }

    pub fn mean(&self) -> Option<Duration> {
        self.non_empty().map(|h| Duration::from_nanos(h.mean() as u64))
    }

    pub fn stddev(&self) -> Option<Duration> {
        self.non_empty().map(|h| Duration::from_nanos(h.stdev() as u64))
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    /// Snapshot of the reported statistics, `None` when empty
    pub fn summary(&self) -> Option<LatencySummary> {
        Some(LatencySummary {
            count: self.len(),
            min: self.min()?,
            mean: self.mean()?,
            stddev: self.stddev()?,
            p50: self.percentile(50.0)?,
            p90: self.percentile(90.0)?,
            p99: self.percentile(99.0)?,
            p99_9: self.percentile(99.9)?,
            max: self.max()?,
        })
    }

    fn non_empty(&self) -> Option<&Histogram<u64>> {
        (!self.is_empty()).then_some(&self.histogram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_histogram() {
        let hist = LatencyHistogram::new().unwrap();
        assert!(hist.is_empty());
        assert!(hist.percentile(50.0).is_none());
        assert!(hist.summary().is_none());
    }

    #[test]
    fn test_percentile() {
        let mut hist = LatencyHistogram::new().unwrap();
        for i in 1..=100 {
            hist.record(Duration::from_micros(i * 10));
        }

        let p50 = hist.percentile(50.0).unwrap();
        let p99 = hist.percentile(99.0).unwrap();

        assert!(p50.as_micros() >= 450 && p50.as_micros() <= 550);
        assert!(p99.as_micros() >= 940 && p99.as_micros() <= 1040);
    }

    #[test]
    fn test_min_max_mean() {
        let mut hist = LatencyHistogram::new().unwrap();
        hist.record(Duration::from_micros(100));
        hist.record(Duration::from_micros(300));
        hist.record(Duration::from_micros(200));

        assert!(hist.min().unwrap().as_micros() >= 95);
        assert!(hist.max().unwrap().as_micros() <= 305);
        let mean = hist.mean().unwrap().as_micros();
        assert!((190..=210).contains(&mean));
    }

    #[test]
    fn test_zero_duration_is_clamped() {
        let mut hist = LatencyHistogram::new().unwrap();
        hist.record(Duration::ZERO);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.min().unwrap(), Duration::from_nanos(1));
    }

    #[test]
    fn test_summary() {
        let mut hist = LatencyHistogram::new().unwrap();
        for i in 1..=10 {
            hist.record(Duration::from_millis(i));
        }

        let summary = hist.summary().unwrap();
        assert_eq!(summary.count, 10);
        assert!(summary.p50 <= summary.p99);
        assert!(summary.min <= summary.mean && summary.mean <= summary.max);
    }
}
