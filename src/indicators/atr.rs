// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR_0 = H - L                      (no previous close)
//   TR_t = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_{period-1} = SMA of the first `period` TR values
//   ATR_t          = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Normalised ATR = ATR / close (a fraction of price).
// =============================================================================

use super::Column;
use crate::market_data::PriceBar;

/// True range of every bar (oldest first).
pub fn true_range(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high - bar.low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(prev_close) => {
                    let hc = (bar.high - prev_close).abs();
                    let lc = (bar.low - prev_close).abs();
                    hl.max(hc).max(lc)
                }
                None => hl,
            }
        })
        .collect()
}

/// Wilder-smoothed ATR aligned to the input rows (missing for the first
/// `period - 1` rows).
///
/// A non-finite intermediate value leaves the remainder of the column missing.
pub fn atr_column(bars: &[PriceBar], period: usize) -> Column {
    let mut column = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return column;
    }

    let tr_values = true_range(bars);

    let seed: f64 = tr_values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return column;
    }
    column[period - 1] = Some(seed);

    let period_f = period as f64;
    let mut atr = seed;
    for (i, &tr) in tr_values.iter().enumerate().skip(period) {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            break;
        }
        column[i] = Some(atr);
    }

    column
}

/// ATR as a fraction of each row's close; missing where the close is zero.
pub fn atr_pct_column(atr: &[Option<f64>], closes: &[f64]) -> Column {
    atr.iter()
        .zip(closes)
        .map(|(a, &c)| a.filter(|_| c != 0.0).map(|a| a / c))
        .collect()
}
