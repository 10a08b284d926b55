// =============================================================================
// Simple & Exponential Moving Averages
// =============================================================================
//
// SMA_t = mean(close_{t-period+1} ..= close_t)
//
// EMA gives more weight to recent prices:
//   multiplier = 2 / (period + 1)
//   EMA_t      = EMA_{t-1} + multiplier * (close_t - EMA_{t-1})
//
// The very first EMA value is seeded with the SMA of the first `period` closes,
// so both averages are first defined at row `period - 1`.
// =============================================================================

use super::{align, Column};

/// Compute the EMA series for the given `closes` slice and look-back `period`.
///
/// Returns an empty `Vec` when the input is too short or the period is zero.
/// Each output element corresponds to a close starting at index `period - 1`.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `closes.len() < period` => empty vec
/// - A non-finite intermediate value stops the series.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let sma: f64 = closes[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - period + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &close in &closes[period..] {
        // Incremental form keeps a constant input exactly constant.
        let ema = prev_ema + multiplier * (close - prev_ema);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// Compute the trailing SMA series; element `k` covers `closes[k..k + period]`.
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }
    closes
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// SMA aligned to the input rows (missing for the first `period - 1` rows).
pub fn sma_column(closes: &[f64], period: usize) -> Column {
    align(calculate_sma(closes, period), period.saturating_sub(1), closes.len())
}

/// EMA aligned to the input rows (missing for the first `period - 1` rows).
pub fn ema_column(closes: &[f64], period: usize) -> Column {
    align(calculate_ema(closes, period), period.saturating_sub(1), closes.len())
}
