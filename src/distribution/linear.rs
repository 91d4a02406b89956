//! Linear index generation
//!
//! Produces 0, 1, 2, ... and wraps back to 0 at the range passed to
//! `next_index`, so the i-th call returns `i mod range`.

use crate::distribution::Distribution;

/// Wrapping counter
#[derive(Debug)]
pub struct LinearDistribution {
    current: u64,
}

impl LinearDistribution {
    pub fn new() -> Self {
        Self { current: 0 }
    }
}

impl Default for LinearDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Distribution for LinearDistribution {
    fn next_index(&mut self, num_rows: u64) -> u64 {
        if num_rows == 0 {
            return 0;
        }

        let index = self.current % num_rows;
        self.current = (index + 1) % num_rows;
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_basic() {
        let mut dist = LinearDistribution::new();

        assert_eq!(dist.next_index(100), 0);
        assert_eq!(dist.next_index(100), 1);
        assert_eq!(dist.next_index(100), 2);
    }

    #[test]
    fn test_linear_wraparound() {
        let mut dist = LinearDistribution::new();
        let seq: Vec<u64> = (0..7).map(|_| dist.next_index(3)).collect();
        assert_eq!(seq, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_linear_zero_range() {
        let mut dist = LinearDistribution::new();
        assert_eq!(dist.next_index(0), 0);
        assert_eq!(dist.next_index(2), 0);
    }
}
