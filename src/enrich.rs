// =============================================================================
// Indicator Engine — PriceSeries => EnrichedSeries
// =============================================================================
//
// A functional transformation: the input series is never mutated and the
// output carries one row per input row. Either the whole enrichment succeeds
// or it fails with a named error; there is no partial result.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::IndicatorConfig;
use crate::error::{AnalysisError, Result};
use crate::indicators::bollinger::{bollinger_columns, BollingerColumns};
use crate::indicators::extrema::{
    rolling_high_column, rolling_low_column, swing_high_flags, swing_low_flags, FlagColumn,
};
use crate::indicators::macd::{macd_columns, MacdColumns};
use crate::indicators::stochastic::{stochastic_columns, williams_r_column, StochasticColumns};
use crate::indicators::{atr, ema, obv, returns, rsi, Column};
use crate::market_data::{PriceBar, PriceField, PriceSeries};

/// Value of `column` at `row`, if the row exists and the value is defined.
#[inline]
pub fn at(column: &[Option<f64>], row: usize) -> Option<f64> {
    column.get(row).copied().flatten()
}

/// A price series together with every derived indicator column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSeries {
    pub symbol: String,
    /// Basis the bars (and so every indicator) are expressed in.
    pub price_field: PriceField,
    pub bars: Vec<PriceBar>,

    pub sma: BTreeMap<usize, Column>,
    pub ema: BTreeMap<usize, Column>,

    pub rsi: Column,
    pub stochastic: StochasticColumns,
    pub williams_r: Column,
    pub macd: MacdColumns,
    pub obv: Column,

    pub bollinger: Vec<BollingerColumns>,
    pub atr: Column,
    /// ATR / close.
    pub atr_pct: Column,

    pub rolling_high: Column,
    pub rolling_low: Column,
    pub swing_high: FlagColumn,
    pub swing_low: FlagColumn,

    /// Trailing simple returns keyed by horizon.
    pub returns: BTreeMap<usize, Column>,
    pub log_return: Column,

    #[serde(skip)]
    config: IndicatorConfig,
}

/// Enrich `series` with the full indicator catalogue.
///
/// Fails with `InsufficientHistory` when the series is shorter than the
/// longest configured window.
pub fn enrich(series: &PriceSeries, config: &IndicatorConfig) -> Result<EnrichedSeries> {
    let required = config.required_history();
    if series.len() < required {
        return Err(AnalysisError::InsufficientHistory {
            required,
            available: series.len(),
        });
    }

    let basis = series.on_basis(config.price_field);
    let bars = basis.bars();
    let closes = basis.closes();

    let sma = config
        .ma_windows
        .iter()
        .map(|&w| (w, ema::sma_column(&closes, w)))
        .collect();
    let ema = config
        .ma_windows
        .iter()
        .map(|&w| (w, ema::ema_column(&closes, w)))
        .collect();

    let atr = atr::atr_column(bars, config.atr_period);
    let atr_pct = atr::atr_pct_column(&atr, &closes);

    let returns = config
        .return_horizons
        .iter()
        .map(|&h| (h, returns::simple_return_column(&closes, h)))
        .collect();

    let enriched = EnrichedSeries {
        symbol: series.symbol().to_string(),
        price_field: config.price_field,
        sma,
        ema,
        rsi: rsi::rsi_column(&closes, config.rsi_period),
        stochastic: stochastic_columns(bars, config.stochastic_period, config.stochastic_smoothing),
        williams_r: williams_r_column(bars, config.williams_period),
        macd: macd_columns(&closes, config.macd_fast, config.macd_slow, config.macd_signal),
        obv: obv::obv_column(bars),
        bollinger: bollinger_columns(&closes, config.bollinger_period, &config.bollinger_multipliers),
        atr,
        atr_pct,
        rolling_high: rolling_high_column(bars, config.extrema_window),
        rolling_low: rolling_low_column(bars, config.extrema_window),
        swing_high: swing_high_flags(bars, config.swing_radius),
        swing_low: swing_low_flags(bars, config.swing_radius),
        returns,
        log_return: returns::log_return_column(&closes),
        bars: bars.to_vec(),
        config: config.clone(),
    };

    debug!(
        symbol = %enriched.symbol,
        rows = enriched.len(),
        price_field = %config.price_field,
        "series enriched"
    );

    Ok(enriched)
}

impl EnrichedSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The indicator configuration this series was enriched with.
    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn close(&self, row: usize) -> Option<f64> {
        self.bars.get(row).map(|b| b.close)
    }

    pub fn date(&self, row: usize) -> Option<NaiveDate> {
        self.bars.get(row).map(|b| b.date)
    }

    /// Row index of `date`, if it is a session of the series.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    /// Row of `date` or `DateNotFound`.
    pub fn row_of(&self, date: NaiveDate) -> Result<usize> {
        self.index_of(date).ok_or(AnalysisError::DateNotFound { date })
    }

    pub fn sma(&self, window: usize) -> Option<&Column> {
        self.sma.get(&window)
    }

    pub fn ema(&self, window: usize) -> Option<&Column> {
        self.ema.get(&window)
    }

    /// Bollinger columns for multiplier `k`.
    pub fn bollinger(&self, k: f64) -> Option<&BollingerColumns> {
        self.bollinger.iter().find(|b| (b.multiplier - k).abs() < 1e-9)
    }

    /// Every derived column under a stable name, swing flags as 1.0 / 0.0.
    /// This is the table layout handed to persistence and export layers.
    pub fn named_columns(&self) -> Vec<(String, Column)> {
        let flag = |c: &FlagColumn| -> Column {
            c.iter().map(|f| f.map(|b| if b { 1.0 } else { 0.0 })).collect()
        };
        let suffix = |k: f64| format!("{k:.1}").replace('.', "_");
        let cfg = &self.config;

        let mut out: Vec<(String, Column)> = Vec::new();
        for (w, c) in &self.sma {
            out.push((format!("sma_{w}"), c.clone()));
        }
        for (w, c) in &self.ema {
            out.push((format!("ema_{w}"), c.clone()));
        }
        out.push((format!("rsi_{}", cfg.rsi_period), self.rsi.clone()));
        out.push(("stoch_k".into(), self.stochastic.k.clone()));
        out.push(("stoch_d".into(), self.stochastic.d.clone()));
        out.push(("williams_r".into(), self.williams_r.clone()));
        out.push(("macd".into(), self.macd.line.clone()));
        out.push(("macd_signal".into(), self.macd.signal.clone()));
        out.push(("macd_histogram".into(), self.macd.histogram.clone()));
        out.push(("obv".into(), self.obv.clone()));
        for band in &self.bollinger {
            let s = suffix(band.multiplier);
            out.push((format!("bb_middle_{s}"), band.middle.clone()));
            out.push((format!("bb_upper_{s}"), band.upper.clone()));
            out.push((format!("bb_lower_{s}"), band.lower.clone()));
        }
        out.push((format!("atr_{}", cfg.atr_period), self.atr.clone()));
        out.push(("atr_pct".into(), self.atr_pct.clone()));
        out.push((format!("high_{}", cfg.extrema_window), self.rolling_high.clone()));
        out.push((format!("low_{}", cfg.extrema_window), self.rolling_low.clone()));
        out.push(("swing_high".into(), flag(&self.swing_high)));
        out.push(("swing_low".into(), flag(&self.swing_low)));
        for (h, c) in &self.returns {
            out.push((format!("return_{h}"), c.clone()));
        }
        out.push(("log_return".into(), self.log_return.clone()));
        out
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::market_data::series::tests::day;

    /// `n` daily bars with close rising linearly from `from` to `to`,
    /// constant volume 100 000 and a 0.5 wick on each side.
    pub(crate) fn linear_series(n: usize, from: f64, to: f64) -> PriceSeries {
        let step = (to - from) / (n - 1) as f64;
        let bars = (0..n)
            .map(|i| {
                let close = from + step * i as f64;
                PriceBar {
                    date: day(i as i64),
                    open: close - step / 2.0,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    adjusted_close: close,
                    volume: 100_000,
                    trade_count: None,
                }
            })
            .collect();
        PriceSeries::new("LINEAR", bars).unwrap()
    }

    /// `n` bars with open = high = low = close = `price`.
    pub(crate) fn flat_series(n: usize, price: f64) -> PriceSeries {
        let bars = (0..n)
            .map(|i| PriceBar {
                date: day(i as i64),
                open: price,
                high: price,
                low: price,
                close: price,
                adjusted_close: price,
                volume: 100_000,
                trade_count: None,
            })
            .collect();
        PriceSeries::new("FLAT", bars).unwrap()
    }

    #[test]
    fn rejects_short_series() {
        let series = linear_series(150, 10.0, 20.0);
        let err = enrich(&series, &IndicatorConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientHistory {
                required: 200,
                available: 150
            }
        );
    }

    #[test]
    fn row_count_and_warmup() {
        let series = linear_series(260, 10.0, 30.0);
        let e = enrich(&series, &IndicatorConfig::default()).unwrap();
        let n = series.len();

        for (name, column) in e.named_columns() {
            assert_eq!(column.len(), n, "{name}");
        }

        let sma200 = e.sma(200).unwrap();
        assert!(sma200[..199].iter().all(Option::is_none));
        assert!(sma200[199..].iter().all(Option::is_some));

        let ema72 = e.ema(72).unwrap();
        assert!(ema72[70].is_none());
        assert!(ema72[71..].iter().all(Option::is_some));

        assert!(e.rsi[13].is_none() && e.rsi[14].is_some());
        assert!(e.atr[12].is_none() && e.atr[13].is_some());
        assert!(e.bollinger[0].upper[18].is_none() && e.bollinger[0].upper[19].is_some());
        assert!(e.rolling_high[250].is_none() && e.rolling_high[251].is_some());
        assert!(e.returns[&126][125].is_none() && e.returns[&126][126].is_some());
        assert_eq!(e.obv[0], Some(0.0));
    }

    #[test]
    fn enrichment_is_idempotent() {
        let series = linear_series(220, 5.0, 9.0);
        let cfg = IndicatorConfig::default();
        let a = enrich(&series, &cfg).unwrap();
        let b = enrich(&series, &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn linear_rise_scenario() {
        let series = linear_series(300, 10.0, 40.0);
        let e = enrich(&series, &IndicatorConfig::default()).unwrap();
        let last = 299;
        let close = e.close(last).unwrap();

        assert!(at(e.sma(200).unwrap(), last).unwrap() < close);
        let e9 = at(e.ema(9).unwrap(), last).unwrap();
        let e21 = at(e.ema(21).unwrap(), last).unwrap();
        let e72 = at(e.ema(72).unwrap(), last).unwrap();
        assert!(e9 > e21 && e21 > e72);

        for row in 250..300 {
            assert!(at(&e.rsi, row).unwrap() > 50.0);
        }
        // ~1 point of range on a 40 price.
        assert!(at(&e.atr_pct, last).unwrap() < 0.05);
        assert!(e.swing_low[250..].iter().flatten().all(|&f| !f));
    }

    #[test]
    fn flat_scenario() {
        let series = flat_series(250, 25.0);
        let e = enrich(&series, &IndicatorConfig::default()).unwrap();
        let last = 249;
        for band in &e.bollinger {
            assert_eq!(at(&band.upper, last), Some(25.0));
            assert_eq!(at(&band.lower, last), Some(25.0));
        }
        assert_eq!(at(&e.atr, last), Some(0.0));
        assert_eq!(at(&e.rsi, last), Some(50.0));
        assert_eq!(at(&e.stochastic.k, last), Some(50.0));
    }

    #[test]
    fn oscillators_stay_bounded() {
        let bars = (0..300)
            .map(|i| {
                let c = 20.0 + (i as f64 * 0.21).sin() * 4.0 + (i as f64 * 0.05).cos();
                PriceBar {
                    date: day(i),
                    open: c,
                    high: c + 0.7,
                    low: c - 0.9,
                    close: c,
                    adjusted_close: c,
                    volume: 1_000 + (i as u64 % 7) * 100,
                    trade_count: None,
                }
            })
            .collect();
        let series = PriceSeries::new("WAVE", bars).unwrap();
        let e = enrich(&series, &IndicatorConfig::default()).unwrap();
        for v in e.rsi.iter().chain(&e.stochastic.k).chain(&e.stochastic.d).flatten() {
            assert!((0.0..=100.0).contains(v), "{v}");
        }
    }

    #[test]
    fn adjusted_basis_is_recorded() {
        let series = linear_series(210, 10.0, 20.0);
        let cfg = IndicatorConfig {
            price_field: PriceField::AdjustedClose,
            ..IndicatorConfig::default()
        };
        let e = enrich(&series, &cfg).unwrap();
        assert_eq!(e.price_field, PriceField::AdjustedClose);
    }

    #[test]
    fn named_columns_cover_every_band() {
        let series = linear_series(210, 10.0, 20.0);
        let e = enrich(&series, &IndicatorConfig::default()).unwrap();
        let names: Vec<String> = e.named_columns().into_iter().map(|(n, _)| n).collect();
        for expected in ["bb_upper_2_0", "bb_upper_2_5", "bb_lower_3_0", "ema_72", "rsi_14", "high_252"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
