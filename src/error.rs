//! Typed configuration errors
//!
//! Everything else in the crate propagates `anyhow::Error`. These are the
//! fatal, non-retryable configuration mistakes that callers may want to match
//! on (for example to report an unsupported device before any work starts).

use thiserror::Error;

/// Fatal configuration error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Device string does not start with `cpu` or `cuda`
    #[error("Unknown compute device {0}")]
    UnknownDevice(String),

    /// Input group does not declare the batch size and pooling factor axes
    #[error("input group {group} expects {expected} axes (batch_size, pooling_factor), got {found}")]
    AxisCount {
        group: usize,
        expected: usize,
        found: usize,
    },

    /// Per-table list length differs from `num_tables`
    #[error("{field} has {found} entries but num_tables is {expected}")]
    TableCount {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// `__range__` axis with a bad shape or a zero step
    #[error("invalid range {0:?}: expected [start, stop] or [start, stop, step] with step > 0")]
    InvalidRange(Vec<u64>),

    /// Per-table list given where a single value is required
    #[error("{field} must be a single value, got a per-table list")]
    NotScalar { field: &'static str },

    /// Loaded override tensors disagree with the declared request shape
    #[error("override {field} has {found} elements, expected {expected}")]
    OverrideShape {
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_device_message_names_device() {
        let err = ConfigError::UnknownDevice("tpu:0".to_string());
        assert_eq!(err.to_string(), "Unknown compute device tpu:0");
    }

    #[test]
    fn test_table_count_message() {
        let err = ConfigError::TableCount {
            field: "rows",
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "rows has 2 entries but num_tables is 3");
    }
}
