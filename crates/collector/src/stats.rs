//! Summary statistics for aggregation groups.

/// Avg/min/max/stddev over one aggregation group for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n-1 divisor); defined as 0 for n == 1.
    pub stddev: f64,
}

/// Summarize a group's collected values. Empty input yields `None`.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let avg = values.iter().sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let stddev = if values.len() > 1 {
        let sum_sq = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>();
        (sum_sq / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    Some(Summary {
        avg,
        min,
        max,
        stddev,
    })
}
