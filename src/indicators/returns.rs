// =============================================================================
// Returns — trailing simple and log returns
// =============================================================================
//
//   simple_h = close_t / close_{t-h} - 1
//   log_1    = ln(close_t / close_{t-1})
//
// Only backward-looking horizons live here; forward targets for model
// training are built in the feature export.

use super::Column;

/// Simple return over `horizon` bars; missing for the first `horizon` rows and
/// where the base close is zero.
pub fn simple_return_column(closes: &[f64], horizon: usize) -> Column {
    (0..closes.len())
        .map(|i| {
            let base = closes[i.checked_sub(horizon)?];
            (horizon > 0 && base != 0.0).then(|| closes[i] / base - 1.0)
        })
        .collect()
}

/// One-bar log return; missing on the first row and for non-positive closes.
pub fn log_return_column(closes: &[f64]) -> Column {
    (0..closes.len())
        .map(|i| {
            let prev = closes[i.checked_sub(1)?];
            let curr = closes[i];
            (prev > 0.0 && curr > 0.0).then(|| (curr / prev).ln())
        })
        .collect()
}

/// Simple return of `close[end]` against `close[end - horizon]`.
pub fn trailing_return(closes: &[f64], end: usize, horizon: usize) -> Option<f64> {
    simple_return_column(closes.get(..=end)?, horizon).pop().flatten()
}
