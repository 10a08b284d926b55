// =============================================================================
// Trend Classifier
// =============================================================================
//
// Reads the EMA stack (short / medium / long) against a long SMA baseline.
//
//   slope_x   = (EMA_x[i] - EMA_x[i-h]) / h / close[i]      (dimensionless)
//
//   crossover = BULLISH_STACK  if EMA_s > EMA_m > EMA_l and close > SMA_b
//               BEARISH_STACK  if EMA_s < EMA_m < EMA_l and close < SMA_b
//               MIXED          otherwise
//
//   direction = UPTREND    if bullish stack, or mixed with slope_m > 0 and close > SMA_b
//               DOWNTREND  if bearish stack, or mixed with slope_m < 0 and close < SMA_b
//               SIDEWAYS   otherwise
//
// Strength comes from |slope_m| against the configured thresholds and is
// always NONE for a sideways market.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrendThresholds;
use crate::enrich::{at, EnrichedSeries};
use crate::error::{AnalysisError, Result};
use crate::indicators::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
    Sideways,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uptrend => write!(f, "UPTREND"),
            Self::Downtrend => write!(f, "DOWNTREND"),
            Self::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrength {
    None,
    Moderate,
    Strong,
}

impl std::fmt::Display for TrendStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Strong => write!(f, "STRONG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossover {
    BullishStack,
    BearishStack,
    Mixed,
}

impl std::fmt::Display for Crossover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BullishStack => write!(f, "BULLISH_STACK"),
            Self::BearishStack => write!(f, "BEARISH_STACK"),
            Self::Mixed => write!(f, "MIXED"),
        }
    }
}

/// Trend reading of one series at one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub direction: TrendDirection,
    pub strength: TrendStrength,
    pub slope_short: f64,
    pub slope_medium: f64,
    pub slope_long: f64,
    pub crossover: Crossover,
}

/// Classify the trend of `series` as of `row`.
///
/// Fails with `MissingColumn` when one of the configured averages was not
/// enriched, and with `InsufficientHistory` while any of them is still
/// warming up at `row`.
pub fn classify_trend(
    series: &EnrichedSeries,
    row: usize,
    thresholds: &TrendThresholds,
) -> Result<TrendSnapshot> {
    let ema_short = ema(series, thresholds.short_window)?;
    let ema_medium = ema(series, thresholds.medium_window)?;
    let ema_long = ema(series, thresholds.long_window)?;
    let baseline = series
        .sma(thresholds.baseline_window)
        .ok_or_else(|| AnalysisError::MissingColumn {
            name: format!("sma_{}", thresholds.baseline_window),
        })?;

    let h = thresholds.slope_horizon.max(1);
    let longest_ema = thresholds
        .short_window
        .max(thresholds.medium_window)
        .max(thresholds.long_window);
    let required = (longest_ema + h).max(thresholds.baseline_window);
    let insufficient = || AnalysisError::InsufficientHistory {
        required,
        available: (row + 1).min(series.len()),
    };
    if row + 1 < required || row >= series.len() {
        return Err(insufficient());
    }

    let close = series.close(row).ok_or_else(insufficient)?;
    let slope = |column: &Column| -> Option<f64> {
        let now = at(column, row)?;
        let then = at(column, row - h)?;
        let s = (now - then) / h as f64 / close;
        s.is_finite().then_some(s)
    };

    let slope_short = slope(ema_short).ok_or_else(insufficient)?;
    let slope_medium = slope(ema_medium).ok_or_else(insufficient)?;
    let slope_long = slope(ema_long).ok_or_else(insufficient)?;

    let s = at(ema_short, row).ok_or_else(insufficient)?;
    let m = at(ema_medium, row).ok_or_else(insufficient)?;
    let l = at(ema_long, row).ok_or_else(insufficient)?;
    let base = at(baseline, row).ok_or_else(insufficient)?;

    let crossover = if s > m && m > l && close > base {
        Crossover::BullishStack
    } else if s < m && m < l && close < base {
        Crossover::BearishStack
    } else {
        Crossover::Mixed
    };

    let direction = match crossover {
        Crossover::BullishStack => TrendDirection::Uptrend,
        Crossover::BearishStack => TrendDirection::Downtrend,
        Crossover::Mixed if slope_medium > 0.0 && close > base => TrendDirection::Uptrend,
        Crossover::Mixed if slope_medium < 0.0 && close < base => TrendDirection::Downtrend,
        Crossover::Mixed => TrendDirection::Sideways,
    };

    let strength = match direction {
        TrendDirection::Sideways => TrendStrength::None,
        _ => strength_tier(slope_medium, thresholds),
    };

    debug!(
        symbol = %series.symbol,
        row,
        direction = %direction,
        strength = %strength,
        crossover = %crossover,
        slope_medium = format!("{:.6}", slope_medium),
        "trend classified"
    );

    Ok(TrendSnapshot {
        direction,
        strength,
        slope_short,
        slope_medium,
        slope_long,
        crossover,
    })
}

/// Strength tier for a medium slope.
pub fn strength_tier(slope_medium: f64, thresholds: &TrendThresholds) -> TrendStrength {
    let magnitude = slope_medium.abs();
    if magnitude >= thresholds.strong_slope {
        TrendStrength::Strong
    } else if magnitude >= thresholds.moderate_slope {
        TrendStrength::Moderate
    } else {
        TrendStrength::None
    }
}

fn ema(series: &EnrichedSeries, window: usize) -> Result<&Column> {
    series.ema(window).ok_or_else(|| AnalysisError::MissingColumn {
        name: format!("ema_{window}"),
    })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;
    use crate::enrich::enrich;
    use crate::enrich::tests::{flat_series, linear_series};

    #[test]
    fn rising_series_is_strong_uptrend() {
        let e = enrich(&linear_series(300, 10.0, 40.0), &IndicatorConfig::default()).unwrap();
        let t = classify_trend(&e, 299, &TrendThresholds::default()).unwrap();
        assert_eq!(t.crossover, Crossover::BullishStack);
        assert_eq!(t.direction, TrendDirection::Uptrend);
        assert_eq!(t.strength, TrendStrength::Strong);
        assert!(t.slope_short > 0.0 && t.slope_medium > 0.0 && t.slope_long > 0.0);
    }

    #[test]
    fn falling_series_is_downtrend() {
        let e = enrich(&linear_series(300, 40.0, 10.0), &IndicatorConfig::default()).unwrap();
        let t = classify_trend(&e, 299, &TrendThresholds::default()).unwrap();
        assert_eq!(t.crossover, Crossover::BearishStack);
        assert_eq!(t.direction, TrendDirection::Downtrend);
        assert!(t.slope_medium < 0.0);
    }

    #[test]
    fn flat_series_is_sideways() {
        let e = enrich(&flat_series(250, 25.0), &IndicatorConfig::default()).unwrap();
        let t = classify_trend(&e, 249, &TrendThresholds::default()).unwrap();
        assert_eq!(t.crossover, Crossover::Mixed);
        assert_eq!(t.direction, TrendDirection::Sideways);
        assert_eq!(t.strength, TrendStrength::None);
        assert_eq!(t.slope_medium, 0.0);
    }

    #[test]
    fn warming_up_row_is_rejected() {
        let e = enrich(&linear_series(300, 10.0, 40.0), &IndicatorConfig::default()).unwrap();
        let err = classify_trend(&e, 150, &TrendThresholds::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientHistory { required: 200, .. }));
    }

    #[test]
    fn unknown_window_is_missing_column() {
        let e = enrich(&linear_series(300, 10.0, 40.0), &IndicatorConfig::default()).unwrap();
        let thresholds = TrendThresholds {
            medium_window: 50,
            ..TrendThresholds::default()
        };
        let err = classify_trend(&e, 299, &thresholds).unwrap_err();
        assert_eq!(err, AnalysisError::MissingColumn { name: "ema_50".into() });
    }

    #[test]
    fn tiers_follow_thresholds() {
        let t = TrendThresholds::default();
        assert_eq!(strength_tier(0.0001, &t), TrendStrength::None);
        assert_eq!(strength_tier(-0.0007, &t), TrendStrength::Moderate);
        assert_eq!(strength_tier(0.002, &t), TrendStrength::Strong);
    }
}
