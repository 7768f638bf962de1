//! Descriptive statistics over a per-window sample.

use serde::{Deserialize, Serialize};

/// Min / median / mean / max of one metric over an aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub min: f64,
    pub median: f64,
    pub mean: f64,
    pub max: f64,
}

impl StatSummary {
    /// Computes the summary over the full sample, or `None` when it is empty.
    ///
    /// Median uses linear interpolation for even counts (the average of the
    /// two middle values). Non-finite values are not expected from the
    /// warehouse and are not filtered here.
    pub fn from_sample(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        let mean = sorted.iter().sum::<f64>() / n as f64;

        Some(Self {
            min: sorted[0],
            median,
            mean,
            max: sorted[n - 1],
        })
    }
}
