// =============================================================================
// Analysis Configuration — named, tunable parameters for every analyzer
// =============================================================================
//
// All fields carry `#[serde(default)]` so that a partial JSON section only
// overrides what it names. None of these values are mathematical constants;
// they are domain-tunable knobs.

use serde::{Deserialize, Serialize};

use crate::market_data::PriceField;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_ma_windows() -> Vec<usize> {
    vec![9, 21, 72, 200]
}

fn default_rsi_period() -> usize {
    14
}

fn default_stochastic_period() -> usize {
    14
}

fn default_stochastic_smoothing() -> usize {
    3
}

fn default_williams_period() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_bollinger_period() -> usize {
    20
}

fn default_bollinger_multipliers() -> Vec<f64> {
    vec![2.0, 2.5, 3.0]
}

fn default_atr_period() -> usize {
    14
}

fn default_extrema_window() -> usize {
    252
}

fn default_swing_radius() -> usize {
    3
}

fn default_return_horizons() -> Vec<usize> {
    vec![1, 5, 21, 63, 126]
}

fn default_level_lookback() -> usize {
    252
}

fn default_max_distance_pct() -> f64 {
    15.0
}

fn default_dedup_tolerance_pct() -> f64 {
    0.5
}

fn default_round_subdivisions() -> u32 {
    4
}

fn default_round_count() -> usize {
    3
}

fn default_fib_retracements() -> Vec<f64> {
    vec![0.236, 0.382, 0.5, 0.618, 0.786]
}

fn default_fib_extensions() -> Vec<f64> {
    vec![1.272, 1.618]
}

fn default_max_levels() -> usize {
    12
}

fn default_trend_short() -> usize {
    9
}

fn default_trend_medium() -> usize {
    21
}

fn default_trend_long() -> usize {
    72
}

fn default_trend_baseline() -> usize {
    200
}

fn default_slope_horizon() -> usize {
    5
}

fn default_moderate_slope() -> f64 {
    0.0005
}

fn default_strong_slope() -> f64 {
    0.001
}

fn default_weekly_baseline() -> usize {
    40
}

fn default_weekly_extrema_window() -> usize {
    52
}

fn default_weekly_return_horizons() -> Vec<usize> {
    vec![1, 4, 13]
}

fn default_rsi_oversold() -> f64 {
    30.0
}

fn default_rsi_rebound_ceiling() -> f64 {
    45.0
}

fn default_min_volume_ratio() -> f64 {
    1.0
}

fn default_divergence_window() -> usize {
    15
}

fn default_momentum_horizons() -> Vec<usize> {
    vec![21, 63, 126]
}

fn default_volume_window() -> usize {
    20
}

fn default_low_atr_pct() -> f64 {
    1.5
}

fn default_high_atr_pct() -> f64 {
    3.5
}

fn default_correlation_window() -> usize {
    60
}

fn default_breakout_tolerance_pct() -> f64 {
    0.5
}

fn default_extreme_proximity_pct() -> f64 {
    5.0
}

// =============================================================================
// IndicatorConfig
// =============================================================================

/// Windows and multipliers of the indicator engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Which close the indicators are computed on. `adjusted_close` rescales
    /// the whole bar so raw and adjusted prices are never mixed.
    #[serde(default)]
    pub price_field: PriceField,

    /// Windows for both the simple and exponential averages.
    #[serde(default = "default_ma_windows")]
    pub ma_windows: Vec<usize>,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_stochastic_period")]
    pub stochastic_period: usize,

    /// Window of the %D simple average.
    #[serde(default = "default_stochastic_smoothing")]
    pub stochastic_smoothing: usize,

    #[serde(default = "default_williams_period")]
    pub williams_period: usize,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,

    /// One band pair per multiplier, all around the same middle band.
    #[serde(default = "default_bollinger_multipliers")]
    pub bollinger_multipliers: Vec<f64>,

    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Rolling high/low window (252 sessions ~ 52 weeks).
    #[serde(default = "default_extrema_window")]
    pub extrema_window: usize,

    /// Bars on each side a swing pivot must beat.
    #[serde(default = "default_swing_radius")]
    pub swing_radius: usize,

    /// Trailing simple-return horizons in bars.
    #[serde(default = "default_return_horizons")]
    pub return_horizons: Vec<usize>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            price_field: PriceField::default(),
            ma_windows: default_ma_windows(),
            rsi_period: default_rsi_period(),
            stochastic_period: default_stochastic_period(),
            stochastic_smoothing: default_stochastic_smoothing(),
            williams_period: default_williams_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            bollinger_period: default_bollinger_period(),
            bollinger_multipliers: default_bollinger_multipliers(),
            atr_period: default_atr_period(),
            extrema_window: default_extrema_window(),
            swing_radius: default_swing_radius(),
            return_horizons: default_return_horizons(),
        }
    }
}

impl IndicatorConfig {
    /// The longest indicator window; shorter series are rejected.
    ///
    /// The rolling-extreme window is a lookback, not a requirement: it simply
    /// stays missing on shorter series.
    pub fn required_history(&self) -> usize {
        let ma = self.ma_windows.iter().copied().max().unwrap_or(0);
        [
            ma,
            self.rsi_period + 1,
            self.stochastic_period + self.stochastic_smoothing.saturating_sub(1),
            self.williams_period,
            self.macd_slow + self.macd_signal.saturating_sub(1),
            self.bollinger_period,
            self.atr_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
        .max(1)
    }
}

// =============================================================================
// LevelConfig
// =============================================================================

/// Parameters of the support/resistance locator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Bars of history scanned for swing points.
    #[serde(default = "default_level_lookback")]
    pub lookback: usize,

    /// Candidates farther than this percentage of the reference price are dropped.
    #[serde(default = "default_max_distance_pct")]
    pub max_distance_pct: f64,

    /// Candidates closer than this percentage of the reference price collapse.
    #[serde(default = "default_dedup_tolerance_pct")]
    pub dedup_tolerance_pct: f64,

    /// Round-number step = 10^floor(log10(price)) / subdivisions.
    #[serde(default = "default_round_subdivisions")]
    pub round_subdivisions: u32,

    /// Round numbers generated on each side of the reference price.
    #[serde(default = "default_round_count")]
    pub round_count: usize,

    #[serde(default = "default_fib_retracements")]
    pub fib_retracements: Vec<f64>,

    #[serde(default = "default_fib_extensions")]
    pub fib_extensions: Vec<f64>,

    /// Maximum number of ranked levels returned.
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            lookback: default_level_lookback(),
            max_distance_pct: default_max_distance_pct(),
            dedup_tolerance_pct: default_dedup_tolerance_pct(),
            round_subdivisions: default_round_subdivisions(),
            round_count: default_round_count(),
            fib_retracements: default_fib_retracements(),
            fib_extensions: default_fib_extensions(),
            max_levels: default_max_levels(),
        }
    }
}

// =============================================================================
// TrendThresholds
// =============================================================================

/// Slope thresholds of the trend classifier. Slopes are per-bar changes of an
/// EMA divided by the close, so the thresholds are dimensionless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendThresholds {
    /// EMA window behind `slope_short`.
    #[serde(default = "default_trend_short")]
    pub short_window: usize,

    /// EMA window behind `slope_medium`; its slope also sets the strength tier.
    #[serde(default = "default_trend_medium")]
    pub medium_window: usize,

    #[serde(default = "default_trend_long")]
    pub long_window: usize,

    /// SMA the close is compared against.
    #[serde(default = "default_trend_baseline")]
    pub baseline_window: usize,

    /// Finite-difference horizon in bars.
    #[serde(default = "default_slope_horizon")]
    pub slope_horizon: usize,

    /// |slope_medium| below this => no strength.
    #[serde(default = "default_moderate_slope")]
    pub moderate_slope: f64,

    /// |slope_medium| at or above this => strong.
    #[serde(default = "default_strong_slope")]
    pub strong_slope: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            short_window: default_trend_short(),
            medium_window: default_trend_medium(),
            long_window: default_trend_long(),
            baseline_window: default_trend_baseline(),
            slope_horizon: default_slope_horizon(),
            moderate_slope: default_moderate_slope(),
            strong_slope: default_strong_slope(),
        }
    }
}

// =============================================================================
// WeeklyConfig
// =============================================================================

/// Overrides applied to the weekly resample.
///
/// The weekly series reuses the daily indicator periods and the daily EMA
/// trend windows. Only the baseline and the lookbacks are expressed in weeks,
/// so a weekly trend needs about a year and a half of history instead of 200
/// weekly bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyConfig {
    /// SMA the weekly close is compared against (40 weeks ~ 200 sessions).
    #[serde(default = "default_weekly_baseline")]
    pub baseline_window: usize,

    /// Rolling high/low window in weeks.
    #[serde(default = "default_weekly_extrema_window")]
    pub extrema_window: usize,

    #[serde(default = "default_weekly_return_horizons")]
    pub return_horizons: Vec<usize>,
}

impl Default for WeeklyConfig {
    fn default() -> Self {
        Self {
            baseline_window: default_weekly_baseline(),
            extrema_window: default_weekly_extrema_window(),
            return_horizons: default_weekly_return_horizons(),
        }
    }
}

impl WeeklyConfig {
    /// Trend thresholds for the weekly series.
    pub fn trend(&self, daily: &TrendThresholds) -> TrendThresholds {
        TrendThresholds {
            baseline_window: self.baseline_window,
            ..daily.clone()
        }
    }

    /// Indicator windows for the weekly series: exactly the averages the
    /// weekly trend reads, plus the daily oscillator periods.
    pub fn indicators(&self, daily: &IndicatorConfig, trend: &TrendThresholds) -> IndicatorConfig {
        let mut ma_windows = vec![
            trend.short_window,
            trend.medium_window,
            trend.long_window,
            self.baseline_window,
        ];
        ma_windows.sort_unstable();
        ma_windows.dedup();
        IndicatorConfig {
            ma_windows,
            extrema_window: self.extrema_window,
            return_horizons: self.return_horizons.clone(),
            ..daily.clone()
        }
    }
}

// =============================================================================
// DivergenceConfig / SnapshotConfig / SetupConfig / MomentumConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceConfig {
    #[serde(default = "default_divergence_window")]
    pub window: usize,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            window: default_divergence_window(),
        }
    }
}

/// Parameters used while composing the snapshot itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Bars averaged for the volume-vs-average ratio.
    #[serde(default = "default_volume_window")]
    pub volume_window: usize,

    /// Normalised ATR (percent of price) below this is `low`.
    #[serde(default = "default_low_atr_pct")]
    pub low_atr_pct: f64,

    /// Normalised ATR (percent of price) at or above this is `high`.
    #[serde(default = "default_high_atr_pct")]
    pub high_atr_pct: f64,

    /// Return pairs used for each macro correlation coefficient.
    #[serde(default = "default_correlation_window")]
    pub correlation_window: usize,

    #[serde(default = "default_breakout_tolerance_pct")]
    pub breakout_tolerance_pct: f64,

    /// Close within this percentage of the 52-week high/low raises a flag.
    #[serde(default = "default_extreme_proximity_pct")]
    pub extreme_proximity_pct: f64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            volume_window: default_volume_window(),
            low_atr_pct: default_low_atr_pct(),
            high_atr_pct: default_high_atr_pct(),
            correlation_window: default_correlation_window(),
            breakout_tolerance_pct: default_breakout_tolerance_pct(),
            extreme_proximity_pct: default_extreme_proximity_pct(),
        }
    }
}

/// Thresholds of the named trading setups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// RSI at or below this is oversold.
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// A rebound only counts while RSI is still at or below this.
    #[serde(default = "default_rsi_rebound_ceiling")]
    pub rsi_rebound_ceiling: f64,

    /// Minimum volume over its trailing average for trend following.
    #[serde(default = "default_min_volume_ratio")]
    pub min_volume_ratio: f64,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: default_rsi_oversold(),
            rsi_rebound_ceiling: default_rsi_rebound_ceiling(),
            min_volume_ratio: default_min_volume_ratio(),
        }
    }
}

/// Horizons of the cross-sectional momentum ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumConfig {
    #[serde(default = "default_momentum_horizons")]
    pub horizons: Vec<usize>,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            horizons: default_momentum_horizons(),
        }
    }
}

// =============================================================================
// AnalysisConfig
// =============================================================================

/// Every tunable of the enrichment and snapshot pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub levels: LevelConfig,
    #[serde(default)]
    pub trend: TrendThresholds,
    #[serde(default)]
    pub weekly: WeeklyConfig,
    #[serde(default)]
    pub divergence: DivergenceConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub momentum: MomentumConfig,
    #[serde(default)]
    pub setups: SetupConfig,
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_required_history_is_longest_average() {
        assert_eq!(IndicatorConfig::default().required_history(), 200);
    }

    #[test]
    fn required_history_tracks_overrides() {
        let cfg = IndicatorConfig {
            ma_windows: vec![5, 10],
            ..IndicatorConfig::default()
        };
        // MACD 26 + 9 - 1 dominates once the averages shrink.
        assert_eq!(cfg.required_history(), 34);
    }

    #[test]
    fn weekly_windows_follow_the_trend() {
        let cfg = AnalysisConfig::default();
        let trend = cfg.weekly.trend(&cfg.trend);
        assert_eq!(trend.baseline_window, 40);
        assert_eq!(trend.long_window, 72);

        let weekly = cfg.weekly.indicators(&cfg.indicators, &trend);
        assert_eq!(weekly.ma_windows, vec![9, 21, 40, 72]);
        assert_eq!(weekly.rsi_period, 14);
        assert_eq!(weekly.required_history(), 72);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
        assert_eq!(cfg.indicators.bollinger_multipliers, vec![2.0, 2.5, 3.0]);
        assert_eq!(cfg.divergence.window, 15);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "indicators": { "price_field": "adjusted_close", "swing_radius": 5 },
            "trend": { "strong_slope": 0.002 }
        }"#;
        let cfg: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.indicators.price_field, PriceField::AdjustedClose);
        assert_eq!(cfg.indicators.swing_radius, 5);
        assert_eq!(cfg.indicators.rsi_period, 14);
        assert!((cfg.trend.strong_slope - 0.002).abs() < f64::EPSILON);
        assert!((cfg.trend.moderate_slope - 0.0005).abs() < f64::EPSILON);
    }
}
