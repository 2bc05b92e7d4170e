//! Numeric column statistics.

use serde::{Deserialize, Serialize};

/// Statistics over the non-null values of a numeric column.
/// An empty column carries only `count: 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ColumnSummary {
    pub count: u64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SummaryStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub sum: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl ColumnSummary {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let sum: f64 = values.iter().sum();
        let average = sum / n;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        let variance = values.iter().map(|v| (v - average).powi(2)).sum::<f64>() / n;
        Self {
            count: values.len() as u64,
            stats: Some(SummaryStats {
                sum,
                average,
                max,
                min,
                std: variance.sqrt(),
            }),
        }
    }
}
