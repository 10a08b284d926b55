// =============================================================================
// Divergence Detector
// =============================================================================
//
// Compares the net change of the close over a short window with the net change
// of RSI, OBV and the MACD histogram over the same window:
//
//   price up,   oscillator down  =>  BEARISH divergence
//   price down, oscillator up    =>  BULLISH divergence
//
// A zero change on either side is never a divergence. When the window does
// not fit in the available history nothing is flagged and the report says so.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DivergenceConfig;
use crate::enrich::{at, EnrichedSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Oscillator {
    Rsi,
    Obv,
    MacdHistogram,
}

impl std::fmt::Display for Oscillator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsi => write!(f, "RSI"),
            Self::Obv => write!(f, "OBV"),
            Self::MacdHistogram => write!(f, "MACD_HIST"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceKind {
    Bullish,
    Bearish,
}

impl std::fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "BULLISH"),
            Self::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// Per-oscillator divergence flags over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    /// Window the flags were evaluated over.
    pub window: usize,
    /// False when the window did not fit; every flag is then false.
    pub sufficient_history: bool,
    pub signals: BTreeMap<Oscillator, Option<DivergenceKind>>,
}

impl DivergenceReport {
    fn empty(window: usize, sufficient_history: bool) -> Self {
        Self {
            window,
            sufficient_history,
            signals: [Oscillator::Rsi, Oscillator::Obv, Oscillator::MacdHistogram]
                .into_iter()
                .map(|o| (o, None))
                .collect(),
        }
    }

    pub fn flag(&self, oscillator: Oscillator) -> bool {
        matches!(self.signals.get(&oscillator), Some(Some(_)))
    }

    /// Oscillator name to boolean.
    pub fn flags(&self) -> BTreeMap<Oscillator, bool> {
        self.signals.iter().map(|(&o, s)| (o, s.is_some())).collect()
    }

    pub fn any(&self) -> bool {
        self.signals.values().any(Option::is_some)
    }
}

/// Net change of `column` from `end - window` to `end`.
pub fn net_change(column: &[Option<f64>], end: usize, window: usize) -> Option<f64> {
    let start = end.checked_sub(window)?;
    Some(at(column, end)? - at(column, start)?)
}

/// Divergence implied by a price change and an oscillator change.
pub fn classify(price_change: f64, oscillator_change: f64) -> Option<DivergenceKind> {
    if price_change > 0.0 && oscillator_change < 0.0 {
        Some(DivergenceKind::Bearish)
    } else if price_change < 0.0 && oscillator_change > 0.0 {
        Some(DivergenceKind::Bullish)
    } else {
        None
    }
}

/// Evaluate every oscillator column against `closes` over `window` bars
/// ending at `end`.
pub fn detect_in_columns(
    closes: &[Option<f64>],
    oscillators: &[(Oscillator, &[Option<f64>])],
    end: usize,
    window: usize,
) -> DivergenceReport {
    let Some(price_change) = net_change(closes, end, window).filter(|_| window > 0) else {
        return DivergenceReport::empty(window, false);
    };

    let mut report = DivergenceReport::empty(window, true);
    for &(oscillator, column) in oscillators {
        match net_change(column, end, window) {
            Some(change) => {
                report.signals.insert(oscillator, classify(price_change, change));
            }
            None => {
                report.sufficient_history = false;
                report.signals.insert(oscillator, None);
            }
        }
    }
    report
}

/// Divergence flags of `series` as of `row`.
pub fn detect_divergences(
    series: &EnrichedSeries,
    row: usize,
    config: &DivergenceConfig,
) -> DivergenceReport {
    let closes: Vec<Option<f64>> = series.bars.iter().map(|b| Some(b.close)).collect();
    let report = detect_in_columns(
        &closes,
        &[
            (Oscillator::Rsi, &series.rsi),
            (Oscillator::Obv, &series.obv),
            (Oscillator::MacdHistogram, &series.macd.histogram),
        ],
        row,
        config.window,
    );

    debug!(
        symbol = %series.symbol,
        row,
        window = report.window,
        sufficient = report.sufficient_history,
        rsi = report.flag(Oscillator::Rsi),
        obv = report.flag(Oscillator::Obv),
        macd = report.flag(Oscillator::MacdHistogram),
        "divergence scan"
    );

    report
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;
    use crate::enrich::enrich;
    use crate::enrich::tests::linear_series;

    fn col(values: impl IntoIterator<Item = f64>) -> Vec<Option<f64>> {
        values.into_iter().map(Some).collect()
    }

    #[test]
    fn rising_price_falling_rsi_is_bearish() {
        let price = col((0..20).map(|i| 10.0 + i as f64 * 0.5));
        let rsi = col((0..20).map(|i| 70.0 - i as f64));
        let flat = col((0..20).map(|_| 1.0));
        let report = detect_in_columns(
            &price,
            &[(Oscillator::Rsi, &rsi), (Oscillator::Obv, &flat)],
            19,
            15,
        );
        assert!(report.sufficient_history);
        assert!(report.flag(Oscillator::Rsi));
        assert_eq!(report.signals[&Oscillator::Rsi], Some(DivergenceKind::Bearish));
        assert!(!report.flag(Oscillator::Obv));
        assert_eq!(report.window, 15);
    }

    #[test]
    fn falling_price_rising_oscillator_is_bullish() {
        let price = col((0..16).map(|i| 30.0 - i as f64));
        let obv = col((0..16).map(|i| i as f64 * 1_000.0));
        let report = detect_in_columns(&price, &[(Oscillator::Obv, &obv)], 15, 15);
        assert_eq!(report.signals[&Oscillator::Obv], Some(DivergenceKind::Bullish));
    }

    #[test]
    fn lockstep_has_no_false_positives() {
        let price = col((0..20).map(|i| 10.0 + i as f64));
        let rsi = col((0..20).map(|i| 40.0 + i as f64));
        let report = detect_in_columns(&price, &[(Oscillator::Rsi, &rsi)], 19, 15);
        assert!(report.sufficient_history);
        assert!(!report.any());
    }

    #[test]
    fn short_history_is_flagged_not_shrunk() {
        let price = col((0..10).map(|i| 10.0 + i as f64));
        let rsi = col((0..10).map(|i| 60.0 - i as f64));
        let report = detect_in_columns(&price, &[(Oscillator::Rsi, &rsi)], 9, 15);
        assert!(!report.sufficient_history);
        assert!(!report.any());
        assert_eq!(report.flags().len(), 3);
    }

    #[test]
    fn undefined_oscillator_start_is_insufficient() {
        let price = col((0..20).map(|i| 10.0 + i as f64));
        let mut rsi = col((0..20).map(|i| 60.0 - i as f64));
        rsi[4] = None;
        let report = detect_in_columns(&price, &[(Oscillator::Rsi, &rsi)], 19, 15);
        assert!(!report.sufficient_history);
        assert!(!report.flag(Oscillator::Rsi));
    }

    #[test]
    fn steady_rise_has_no_divergence() {
        let e = enrich(&linear_series(300, 10.0, 40.0), &IndicatorConfig::default()).unwrap();
        let report = detect_divergences(&e, 299, &DivergenceConfig::default());
        assert!(report.sufficient_history);
        assert!(!report.flag(Oscillator::Obv));
    }
}
