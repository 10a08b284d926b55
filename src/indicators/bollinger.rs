// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ). σ is the sample standard deviation of the
// window. The enrichment computes one band pair per configured multiplier
// around the same middle band.

use serde::{Deserialize, Serialize};

use super::Column;

/// Result of a Bollinger Band calculation for the latest window.
#[derive(Debug, Clone)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle * 100
    pub width: f64,
}

/// Band columns for one multiplier, aligned to the input rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerColumns {
    pub multiplier: f64,
    pub middle: Column,
    pub upper: Column,
    pub lower: Column,
}

/// Mean and sample standard deviation of a window.
fn mean_std(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    if window.len() < 2 {
        return (mean, 0.0);
    }
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// Calculate Bollinger Bands over the most recent `period` closes.
///
/// Returns `None` when there are fewer than `period` closes or the middle
/// band is zero.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerResult> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let (middle, std_dev) = mean_std(&closes[closes.len() - period..]);
    if middle == 0.0 {
        return None;
    }

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    let width = (upper - lower) / middle * 100.0;

    width.is_finite().then_some(BollingerResult {
        upper,
        middle,
        lower,
        width,
    })
}

/// Band columns for each multiplier in `multipliers`.
pub fn bollinger_columns(closes: &[f64], period: usize, multipliers: &[f64]) -> Vec<BollingerColumns> {
    let len = closes.len();
    let mut stats: Vec<Option<(f64, f64)>> = vec![None; len];
    if period > 0 && len >= period {
        for (i, window) in closes.windows(period).enumerate() {
            stats[i + period - 1] = Some(mean_std(window));
        }
    }

    multipliers
        .iter()
        .map(|&k| BollingerColumns {
            multiplier: k,
            middle: stats.iter().map(|s| s.map(|(m, _)| m)).collect(),
            upper: stats.iter().map(|s| s.map(|(m, sd)| m + k * sd)).collect(),
            lower: stats.iter().map(|s| s.map(|(m, sd)| m - k * sd)).collect(),
        })
        .collect()
}
