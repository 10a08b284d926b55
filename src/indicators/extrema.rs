// =============================================================================
// Rolling Extremes & Swing Points
// =============================================================================
//
// Rolling high / low: max(high) / min(low) over the trailing `window` bars
// (252 sessions ~ 52 weeks by default).
//
// Swing flags: bar j is a swing high when its high is strictly greater than
// every other high in [j - radius, j + radius]; swing low symmetrically on
// lows. The flag needs `radius` bars on both sides, so the first and last
// `radius` rows stay missing. A pivot at row j is therefore only known once
// row j + radius has printed.

use super::Column;
use crate::market_data::PriceBar;

/// A swing-flag column; `None` where the symmetric window is incomplete.
pub type FlagColumn = Vec<Option<bool>>;

pub fn rolling_high_column(bars: &[PriceBar], window: usize) -> Column {
    rolling(bars, window, |w| w.iter().map(|b| b.high).fold(f64::MIN, f64::max))
}

pub fn rolling_low_column(bars: &[PriceBar], window: usize) -> Column {
    rolling(bars, window, |w| w.iter().map(|b| b.low).fold(f64::MAX, f64::min))
}

fn rolling(bars: &[PriceBar], window: usize, f: impl Fn(&[PriceBar]) -> f64) -> Column {
    let mut column = vec![None; bars.len()];
    if window == 0 || bars.len() < window {
        return column;
    }
    for (i, w) in bars.windows(window).enumerate() {
        column[i + window - 1] = Some(f(w));
    }
    column
}

pub fn swing_high_flags(bars: &[PriceBar], radius: usize) -> FlagColumn {
    swing_flags(bars, radius, |b| b.high, |candidate, other| candidate > other)
}

pub fn swing_low_flags(bars: &[PriceBar], radius: usize) -> FlagColumn {
    swing_flags(bars, radius, |b| b.low, |candidate, other| candidate < other)
}

fn swing_flags(
    bars: &[PriceBar],
    radius: usize,
    price: impl Fn(&PriceBar) -> f64,
    beats: impl Fn(f64, f64) -> bool,
) -> FlagColumn {
    let len = bars.len();
    let mut flags = vec![None; len];
    if radius == 0 || len < 2 * radius + 1 {
        return flags;
    }
    for j in radius..len - radius {
        let candidate = price(&bars[j]);
        let is_pivot = (j - radius..=j + radius)
            .filter(|&k| k != j)
            .all(|k| beats(candidate, price(&bars[k])));
        flags[j] = Some(is_pivot);
    }
    flags
}
