// =============================================================================
// Snapshot Builder
// =============================================================================
//
// Composes the analyzers into one immutable `MarketSnapshot` per
// (instrument, as-of date). Deterministic: no clock, no randomness, no shared
// state. The as-of date must be a session of the daily series; there is no
// fallback to the nearest prior session.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::breakout::{breakout_signals, BreakoutSignals};
use crate::analysis::correlation::return_correlation;
use crate::analysis::divergence::{detect_divergences, DivergenceReport};
use crate::analysis::levels::{confirmed_pivots, locate_levels, PriceLevel};
use crate::analysis::setups::{evaluate_setups, SetupResult};
use crate::analysis::trend::{classify_trend, TrendSnapshot};
use crate::config::{AnalysisConfig, SnapshotConfig};
use crate::enrich::{at, enrich, EnrichedSeries};
use crate::error::{AnalysisError, Result};
use crate::indicators::bollinger::calculate_bollinger;
use crate::market_data::{resample_weekly, PriceField, PriceSeries};

/// Volatility class from the normalised ATR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtrClass {
    Low,
    Moderate,
    High,
}

impl AtrClass {
    /// Classify a normalised ATR expressed in percent of price.
    pub fn from_pct(atr_pct: f64, config: &SnapshotConfig) -> Self {
        if atr_pct < config.low_atr_pct {
            Self::Low
        } else if atr_pct < config.high_atr_pct {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

impl std::fmt::Display for AtrClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Point-in-time report for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub price_field: PriceField,
    pub close: f64,

    pub trend_daily: TrendSnapshot,
    /// Missing when the weekly series is shorter than the longest window.
    pub trend_weekly: Option<TrendSnapshot>,

    pub levels: Vec<PriceLevel>,
    pub divergence: DivergenceReport,
    pub breakouts: BreakoutSignals,

    /// Volume of the as-of session over the trailing average.
    pub volume_ratio: Option<f64>,
    /// ATR / close.
    pub normalized_atr: f64,
    pub atr_class: AtrClass,

    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    /// Width of the first Bollinger band pair, percent of the middle band.
    pub bollinger_width: Option<f64>,

    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
    pub near_52w_high: bool,
    pub near_52w_low: bool,

    /// Return correlation per reference symbol.
    pub correlations: BTreeMap<String, Option<f64>>,

    /// Named setups evaluated on the as-of bar.
    pub setups: Vec<SetupResult>,
}

/// Assemble the snapshot of `daily` as of `as_of`.
///
/// `weekly` is the enriched weekly resample of the same series, built with
/// the windows of `config.weekly`; its last bar dated on or before `as_of` is
/// used.
pub fn build_snapshot(
    daily: &EnrichedSeries,
    weekly: Option<&EnrichedSeries>,
    references: &[PriceSeries],
    as_of: NaiveDate,
    config: &AnalysisConfig,
) -> Result<MarketSnapshot> {
    let row = daily.row_of(as_of)?;
    let bar = &daily.bars[row];
    let close = bar.close;
    let cfg = &config.snapshot;

    let trend_daily = classify_trend(daily, row, &config.trend)?;

    let weekly = weekly.and_then(|w| {
        let last = w.bars.partition_point(|b| b.date <= as_of).checked_sub(1)?;
        Some((w, last))
    });
    let weekly_trend = config.weekly.trend(&config.trend);
    let trend_weekly = match weekly {
        Some((w, wrow)) => match classify_trend(w, wrow, &weekly_trend) {
            Ok(t) => Some(t),
            Err(AnalysisError::InsufficientHistory { .. }) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };

    let levels = locate_levels(daily, row, weekly, close, &config.levels);
    let divergence = detect_divergences(daily, row, &config.divergence);

    let pivots = confirmed_pivots(daily, row, config.levels.lookback);
    let previous_close = row.checked_sub(1).map(|i| daily.bars[i].close);
    let breakouts = breakout_signals(
        &pivots,
        close,
        previous_close,
        as_of,
        cfg.breakout_tolerance_pct,
    );

    let atr_period = daily.config().atr_period;
    let normalized_atr = at(&daily.atr_pct, row).ok_or(AnalysisError::InsufficientHistory {
        required: atr_period,
        available: row + 1,
    })?;
    let atr_class = AtrClass::from_pct(normalized_atr * 100.0, cfg);

    let closes = daily.closes();
    let bollinger_width = daily
        .config()
        .bollinger_multipliers
        .first()
        .and_then(|&k| calculate_bollinger(&closes[..=row], daily.config().bollinger_period, k))
        .map(|b| b.width);

    let high_52w = at(&daily.rolling_high, row);
    let low_52w = at(&daily.rolling_low, row);
    let proximity = cfg.extreme_proximity_pct / 100.0;
    let near_52w_high = high_52w.is_some_and(|h| close >= h * (1.0 - proximity));
    let near_52w_low = low_52w.is_some_and(|l| close <= l * (1.0 + proximity));

    let correlations = references
        .iter()
        .filter(|r| r.symbol() != daily.symbol)
        .map(|r| {
            let reference = r.on_basis(daily.price_field);
            let rho = return_correlation(&daily.bars, reference.bars(), as_of, cfg.correlation_window);
            (r.symbol().to_string(), rho)
        })
        .collect();

    let mut snapshot = MarketSnapshot {
        symbol: daily.symbol.clone(),
        as_of,
        price_field: daily.price_field,
        close,
        trend_daily,
        trend_weekly,
        levels,
        divergence,
        breakouts,
        volume_ratio: volume_ratio(daily, row, cfg.volume_window),
        normalized_atr,
        atr_class,
        rsi: at(&daily.rsi, row),
        macd_histogram: at(&daily.macd.histogram, row),
        bollinger_width,
        high_52w,
        low_52w,
        near_52w_high,
        near_52w_low,
        correlations,
        setups: Vec::new(),
    };
    snapshot.setups = evaluate_setups(&snapshot, daily, config)?;

    debug!(
        symbol = %snapshot.symbol,
        as_of = %as_of,
        direction = %snapshot.trend_daily.direction,
        levels = snapshot.levels.len(),
        atr_class = %snapshot.atr_class,
        "snapshot built"
    );

    Ok(snapshot)
}

/// Volume at `row` over the mean volume of the trailing `window` bars.
fn volume_ratio(series: &EnrichedSeries, row: usize, window: usize) -> Option<f64> {
    if window == 0 || row + 1 < window {
        return None;
    }
    let slice = &series.bars[row + 1 - window..=row];
    let mean = slice.iter().map(|b| b.volume as f64).sum::<f64>() / window as f64;
    (mean > 0.0).then(|| series.bars[row].volume as f64 / mean)
}

/// Enrich `series` up to `as_of`, resample it weekly and build the snapshot.
///
/// Only history up to `as_of` is read. A weekly resample too short to enrich
/// yields a snapshot without weekly trend.
pub fn analyze(
    series: &PriceSeries,
    references: &[PriceSeries],
    as_of: NaiveDate,
    config: &AnalysisConfig,
) -> Result<MarketSnapshot> {
    let history = series.truncated_at(as_of)?;
    let daily = enrich(&history, &config.indicators)?;

    let weekly_config = config
        .weekly
        .indicators(&config.indicators, &config.weekly.trend(&config.trend));
    let weekly = match enrich(&resample_weekly(&history)?, &weekly_config) {
        Ok(w) => Some(w),
        Err(AnalysisError::InsufficientHistory { required, available }) => {
            debug!(
                symbol = series.symbol(),
                required,
                available,
                "weekly history too short, skipping weekly trend"
            );
            None
        }
        Err(e) => return Err(e),
    };

    build_snapshot(&daily, weekly.as_ref(), references, as_of, config)
}
