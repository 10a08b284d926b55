// =============================================================================
// Swing / Level Locator
// =============================================================================
//
// Candidate sources, strongest first:
//
//   WEEKLY       — confirmed swing pivots of the weekly series
//   SWING        — confirmed swing pivots of the daily series
//   FIBONACCI    — retracements / extensions of the latest swing leg
//   ROUND_NUMBER — multiples of 10^floor(log10(ref)) / subdivisions
//
// Candidates closer than `dedup_tolerance_pct` of the reference collapse to
// the strongest member. Survivors inside the distance band are classified
// (below the reference => support) and ranked nearest-first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LevelConfig;
use crate::enrich::EnrichedSeries;

use super::fibonacci::{fibonacci_levels, latest_leg};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingType {
    High,
    Low,
}

/// A confirmed swing pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub row: usize,
    /// High of a swing high, low of a swing low.
    pub price: f64,
    pub kind: SwingType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

impl std::fmt::Display for LevelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Support => write!(f, "SUPPORT"),
            Self::Resistance => write!(f, "RESISTANCE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    Swing,
    RoundNumber,
    Fibonacci,
    Weekly,
}

impl LevelSource {
    /// Precedence when near-identical candidates collapse.
    pub fn strength(self) -> u8 {
        match self {
            Self::Weekly => 4,
            Self::Swing => 3,
            Self::Fibonacci => 2,
            Self::RoundNumber => 1,
        }
    }
}

impl std::fmt::Display for LevelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Swing => write!(f, "SWING"),
            Self::RoundNumber => write!(f, "ROUND_NUMBER"),
            Self::Fibonacci => write!(f, "FIBONACCI"),
            Self::Weekly => write!(f, "WEEKLY"),
        }
    }
}

/// A ranked support or resistance candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub kind: LevelKind,
    pub source: LevelSource,
    /// 1 = nearest to the reference price.
    pub rank: usize,
    /// Signed distance from the reference, percent.
    pub distance_pct: f64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    price: f64,
    source: LevelSource,
}

// =============================================================================
// Swing pivots
// =============================================================================

/// Swing pivots of `series` known at `row` within the trailing `lookback`
/// bars, sorted by row.
///
/// A pivot at row j needs `radius` bars on its right, so it is only
/// confirmed once j + radius <= row.
pub fn confirmed_pivots(series: &EnrichedSeries, row: usize, lookback: usize) -> Vec<SwingPoint> {
    let radius = series.config().swing_radius;
    let Some(last_confirmed) = row.checked_sub(radius) else {
        return Vec::new();
    };
    let first = (row + 1).saturating_sub(lookback);

    let mut pivots = Vec::new();
    for j in first..=last_confirmed.min(series.len().saturating_sub(1)) {
        let bar = &series.bars[j];
        if series.swing_high.get(j).copied().flatten() == Some(true) {
            pivots.push(SwingPoint { row: j, price: bar.high, kind: SwingType::High });
        }
        if series.swing_low.get(j).copied().flatten() == Some(true) {
            pivots.push(SwingPoint { row: j, price: bar.low, kind: SwingType::Low });
        }
    }
    pivots
}

// =============================================================================
// Round numbers
// =============================================================================

/// `count` multiples of the magnitude step below and above `reference`.
pub fn round_number_levels(reference: f64, subdivisions: u32, count: usize) -> Vec<f64> {
    if !reference.is_finite() || reference <= 0.0 || count == 0 {
        return Vec::new();
    }
    let step = 10f64.powf(reference.log10().floor()) / subdivisions.max(1) as f64;
    let floor = (reference / step).floor() * step;

    let below = (0..count).map(|k| floor - step * k as f64);
    let above = (1..=count).map(|k| floor + step * k as f64);
    below.chain(above).filter(|p| *p > 0.0).collect()
}

// =============================================================================
// Locator
// =============================================================================

/// Rank support/resistance candidates around `reference` as of `row`.
///
/// `weekly` is the enriched weekly series with `weekly_row` its last bar
/// dated on or before the daily as-of date.
pub fn locate_levels(
    daily: &EnrichedSeries,
    row: usize,
    weekly: Option<(&EnrichedSeries, usize)>,
    reference: f64,
    config: &LevelConfig,
) -> Vec<PriceLevel> {
    let mut candidates: Vec<Candidate> = Vec::new();

    let pivots = confirmed_pivots(daily, row, config.lookback);
    candidates.extend(pivots.iter().map(|p| Candidate {
        price: p.price,
        source: LevelSource::Swing,
    }));

    if let Some((weekly, weekly_row)) = weekly {
        // ~5 sessions per week
        let weeks = (config.lookback / 5).max(1);
        candidates.extend(
            confirmed_pivots(weekly, weekly_row, weeks)
                .into_iter()
                .map(|p| Candidate {
                    price: p.price,
                    source: LevelSource::Weekly,
                }),
        );
    }

    if let Some(leg) = latest_leg(&pivots) {
        candidates.extend(
            fibonacci_levels(&leg, &config.fib_retracements, &config.fib_extensions)
                .into_iter()
                .map(|price| Candidate {
                    price,
                    source: LevelSource::Fibonacci,
                }),
        );
    }

    candidates.extend(
        round_number_levels(reference, config.round_subdivisions, config.round_count)
            .into_iter()
            .map(|price| Candidate {
                price,
                source: LevelSource::RoundNumber,
            }),
    );

    let merged = dedup(candidates, reference, config.dedup_tolerance_pct);
    let total = merged.len();
    let levels = rank(merged, reference, config);

    debug!(
        symbol = %daily.symbol,
        row,
        reference = format!("{:.2}", reference),
        pivots = pivots.len(),
        candidates = total,
        levels = levels.len(),
        "levels located"
    );

    levels
}

/// Collapse candidates within `tolerance_pct` of `reference` of each other,
/// keeping the strongest source (nearest to the reference on ties).
fn dedup(mut candidates: Vec<Candidate>, reference: f64, tolerance_pct: f64) -> Vec<Candidate> {
    candidates.retain(|c| c.price.is_finite() && c.price > 0.0);
    candidates.sort_by(|a, b| a.price.total_cmp(&b.price));
    let tolerance = reference.abs() * tolerance_pct / 100.0;

    let mut merged: Vec<Candidate> = Vec::new();
    let mut anchor = f64::NAN;
    for c in candidates {
        match merged.last_mut() {
            Some(kept) if c.price - anchor <= tolerance => {
                let stronger = c.source.strength() > kept.source.strength();
                let tie_closer = c.source.strength() == kept.source.strength()
                    && (c.price - reference).abs() < (kept.price - reference).abs();
                if stronger || tie_closer {
                    *kept = c;
                }
            }
            _ => {
                anchor = c.price;
                merged.push(c);
            }
        }
    }
    merged
}

fn rank(candidates: Vec<Candidate>, reference: f64, config: &LevelConfig) -> Vec<PriceLevel> {
    let distance = |c: &Candidate| (c.price - reference).abs();
    let mut sorted = candidates;
    sorted.sort_by(|a, b| {
        distance(a)
            .total_cmp(&distance(b))
            .then(a.price.total_cmp(&b.price))
    });

    let in_band: Vec<Candidate> = sorted
        .iter()
        .copied()
        .filter(|c| distance(c) / reference * 100.0 <= config.max_distance_pct)
        .collect();
    let kept = if in_band.is_empty() {
        sorted.into_iter().take(1).collect()
    } else {
        in_band
    };

    kept.into_iter()
        .take(config.max_levels.max(1))
        .enumerate()
        .map(|(i, c)| PriceLevel {
            price: c.price,
            kind: if c.price < reference {
                LevelKind::Support
            } else {
                LevelKind::Resistance
            },
            source: c.source,
            rank: i + 1,
            distance_pct: (c.price - reference) / reference * 100.0,
        })
        .collect()
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
    use crate::market_data::series::tests::series_from_closes;

    /// 260 bars oscillating around 20 with a clean zig-zag.
    fn zigzag() -> EnrichedSeries {
        let closes: Vec<f64> = (0..260)
            .map(|i| {
                let phase = (i % 20) as f64;
                let tri = if phase < 10.0 { phase } else { 20.0 - phase };
                18.0 + tri * 0.4
            })
            .collect();
        enrich(&series_from_closes("ZIG", &closes), &IndicatorConfig::default()).unwrap()
    }

    #[test]
    fn round_numbers_scale_with_magnitude() {
        let levels = round_number_levels(41.3, 4, 2);
        // step 2.5
        assert_eq!(levels, vec![40.0, 37.5, 42.5, 45.0]);

        let levels = round_number_levels(3.2, 4, 1);
        assert_eq!(levels, vec![3.0, 3.25]);

        assert!(round_number_levels(0.0, 4, 3).is_empty());
    }

    #[test]
    fn monotonic_rise_has_only_round_numbers() {
        let e = enrich(&linear_series(300, 10.0, 40.0), &IndicatorConfig::default()).unwrap();
        let levels = locate_levels(&e, 299, None, 40.0, &LevelConfig::default());
        assert!(!levels.is_empty());
        assert!(levels.iter().all(|l| l.source == LevelSource::RoundNumber));
    }

    #[test]
    fn levels_are_ranked_and_classified() {
        let e = zigzag();
        let reference = e.close(259).unwrap();
        let cfg = LevelConfig::default();
        let levels = locate_levels(&e, 259, None, reference, &cfg);

        assert!(!levels.is_empty());
        assert!(levels.len() <= cfg.max_levels);
        assert!(levels.iter().any(|l| l.source == LevelSource::Swing));
        for (i, l) in levels.iter().enumerate() {
            assert_eq!(l.rank, i + 1);
            assert_eq!(l.kind == LevelKind::Support, l.price < reference);
            assert!(l.distance_pct.abs() <= cfg.max_distance_pct);
        }
        for pair in levels.windows(2) {
            assert!((pair[0].price - reference).abs() <= (pair[1].price - reference).abs());
        }
    }

    #[test]
    fn pivots_need_confirmation() {
        let e = zigzag();
        let radius = e.config().swing_radius;
        for p in confirmed_pivots(&e, 250, 252) {
            assert!(p.row + radius <= 250);
        }
        // Peaks every 20 bars: a swing high at row 10 + 20k.
        let highs: Vec<usize> = confirmed_pivots(&e, 259, 252)
            .iter()
            .filter(|p| p.kind == SwingType::High)
            .map(|p| p.row)
            .collect();
        assert!(highs.contains(&250));
    }

    #[test]
    fn dedup_keeps_strongest_source() {
        let candidates = vec![
            Candidate { price: 20.0, source: LevelSource::RoundNumber },
            Candidate { price: 20.05, source: LevelSource::Swing },
            Candidate { price: 20.08, source: LevelSource::Fibonacci },
            Candidate { price: 21.0, source: LevelSource::RoundNumber },
        ];
        let merged = dedup(candidates, 20.0, 0.5);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, LevelSource::Swing);
        assert_eq!(merged[0].price, 20.05);
        assert_eq!(merged[1].price, 21.0);
    }

    #[test]
    fn nearest_survives_an_empty_band() {
        let cfg = LevelConfig {
            max_distance_pct: 0.01,
            round_count: 1,
            ..LevelConfig::default()
        };
        let e = enrich(&linear_series(300, 10.0, 40.0), &IndicatorConfig::default()).unwrap();
        let levels = locate_levels(&e, 299, None, 40.3, &cfg);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, 40.0);
        assert_eq!(levels[0].kind, LevelKind::Support);
    }
}
