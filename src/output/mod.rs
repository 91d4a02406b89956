//! Result reporting
//!
//! - [`text`]: per-configuration summary on stdout
//! - [`json`]: machine-readable report file

pub mod json;
pub mod text;

use std::time::Duration;

/// Format duration in human-readable format
pub fn format_duration_human(d: Duration) -> String {
    let nanos = d.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.3}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}
