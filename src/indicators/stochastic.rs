// =============================================================================
// Stochastic Oscillator & Williams %R
// =============================================================================
//
//   %K = 100 * (close - low_n) / (high_n - low_n)
//   %D = SMA(%K, smoothing)
//   %R = -100 * (high_n - close) / (high_n - low_n)
//
// high_n / low_n are the extreme high / low of the trailing `period` bars.
// A flat window (high_n == low_n) yields the mid-scale sentinel: 50 for %K,
// -50 for %R.

use serde::{Deserialize, Serialize};

use super::{align, Column};
use crate::market_data::PriceBar;

/// %K and %D columns aligned to the input rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticColumns {
    pub k: Column,
    pub d: Column,
}

/// Trailing (highest high, lowest low) per row; missing before the window fills.
fn trailing_range(bars: &[PriceBar], period: usize) -> Vec<Option<(f64, f64)>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return out;
    }
    for (i, window) in bars.windows(period).enumerate() {
        let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        out[i + period - 1] = Some((high, low));
    }
    out
}

pub fn stochastic_columns(bars: &[PriceBar], period: usize, smoothing: usize) -> StochasticColumns {
    let k: Column = trailing_range(bars, period)
        .into_iter()
        .zip(bars)
        .map(|(range, bar)| {
            range.map(|(high, low)| {
                if high == low {
                    50.0
                } else {
                    (100.0 * (bar.close - low) / (high - low)).clamp(0.0, 100.0)
                }
            })
        })
        .collect();

    let d = smooth(&k, smoothing);
    StochasticColumns { k, d }
}

pub fn williams_r_column(bars: &[PriceBar], period: usize) -> Column {
    trailing_range(bars, period)
        .into_iter()
        .zip(bars)
        .map(|(range, bar)| {
            range.map(|(high, low)| {
                if high == low {
                    -50.0
                } else {
                    (-100.0 * (high - bar.close) / (high - low)).clamp(-100.0, 0.0)
                }
            })
        })
        .collect()
}

/// Simple average of the last `window` defined values of `column`.
fn smooth(column: &[Option<f64>], window: usize) -> Column {
    let Some(start) = column.iter().position(Option::is_some) else {
        return vec![None; column.len()];
    };
    let defined: Vec<f64> = column[start..].iter().map_while(|v| *v).collect();
    let averaged = super::ema::calculate_sma(&defined, window);
    align(averaged, start + window.saturating_sub(1), column.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::series::tests::day;

    fn bar(i: i64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            date: day(i),
            open: close,
            high,
            low,
            close,
            adjusted_close: close,
            volume: 1,
            trade_count: None,
        }
    }

    #[test]
    fn k_at_top_of_range_is_100() {
        let bars: Vec<PriceBar> = (0..20)
            .map(|i| {
                let c = 10.0 + i as f64;
                bar(i, c, c - 1.0, c)
            })
            .collect();
        let stoch = stochastic_columns(&bars, 14, 3);
        assert!(stoch.k[12].is_none());
        assert_eq!(stoch.k[13], Some(100.0));
        assert!(stoch.d[14].is_none());
        assert_eq!(stoch.d[15], Some(100.0));
    }

    #[test]
    fn flat_window_is_fifty() {
        let bars: Vec<PriceBar> = (0..20).map(|i| bar(i, 25.0, 25.0, 25.0)).collect();
        let stoch = stochastic_columns(&bars, 14, 3);
        assert_eq!(stoch.k[19], Some(50.0));
        assert_eq!(stoch.d[19], Some(50.0));
        assert_eq!(williams_r_column(&bars, 14)[19], Some(-50.0));
    }

    #[test]
    fn values_stay_in_range() {
        let bars: Vec<PriceBar> = (0..80)
            .map(|i| {
                let c = 30.0 + (i as f64 * 0.4).sin() * 5.0;
                bar(i, c + 0.8, c - 0.6, c)
            })
            .collect();
        let stoch = stochastic_columns(&bars, 14, 3);
        for v in stoch.k.iter().chain(stoch.d.iter()).flatten() {
            assert!((0.0..=100.0).contains(v));
        }
        for v in williams_r_column(&bars, 14).iter().flatten() {
            assert!((-100.0..=0.0).contains(v));
        }
    }

    #[test]
    fn williams_at_bottom_of_range_is_minus_100() {
        let bars: Vec<PriceBar> = (0..14)
            .map(|i| {
                let c = 50.0 - i as f64;
                bar(i, c + 1.0, c, c)
            })
            .collect();
        assert_eq!(williams_r_column(&bars, 14)[13], Some(-100.0));
    }
}
