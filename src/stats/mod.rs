//! Latency statistics
//!
//! Each benchmarked configuration gets one [`PassStats`]: a forward and a
//! backward [`LatencyHistogram`] plus the wall time of the timed rounds.

pub mod histogram;

pub use histogram::LatencyHistogram;

use crate::Result;
use std::time::Duration;

/// Reported latency figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub min: Duration,
    pub mean: Duration,
    pub stddev: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub p99_9: Duration,
    pub max: Duration,
}

/// Timings of one configuration's timed rounds
#[derive(Debug, Clone)]
pub struct PassStats {
    pub forward: LatencyHistogram,
    pub backward: LatencyHistogram,
    pub elapsed: Duration,
}

impl PassStats {
    pub fn new() -> Result<Self> {
        Ok(Self {
            forward: LatencyHistogram::new()?,
            backward: LatencyHistogram::new()?,
            elapsed: Duration::ZERO,
        })
    }

    /// Timed forward+backward rounds per second
    pub fn rounds_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.forward.len() as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_per_sec() {
        let mut stats = PassStats::new().unwrap();
        assert_eq!(stats.rounds_per_sec(), 0.0);

        for _ in 0..4 {
            stats.forward.record(Duration::from_millis(1));
        }
        stats.elapsed = Duration::from_secs(2);
        assert!((stats.rounds_per_sec() - 2.0).abs() < 1e-9);
    }
}
