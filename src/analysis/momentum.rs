// =============================================================================
// Momentum Ranking
// =============================================================================
//
// Cross-sectional ranking of instruments by the mean of their trailing simple
// returns over the configured horizons. Horizons without enough history are
// left out of the mean; an instrument with none at all ranks last.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MomentumConfig;
use crate::indicators::returns::trailing_return;
use crate::market_data::PriceSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumEntry {
    pub symbol: String,
    pub last_close: f64,
    pub returns: BTreeMap<usize, Option<f64>>,
    pub score: Option<f64>,
}

/// Rank `universe` by momentum score, highest first.
///
/// With `as_of` set, each series is read up to its last session on or before
/// that date; series with no such session are skipped.
pub fn momentum_ranking(
    universe: &[PriceSeries],
    as_of: Option<NaiveDate>,
    config: &MomentumConfig,
) -> Vec<MomentumEntry> {
    let mut entries: Vec<MomentumEntry> = universe
        .iter()
        .filter_map(|series| {
            let bars = series.bars();
            let end = match as_of {
                Some(date) => bars.partition_point(|b| b.date <= date).checked_sub(1)?,
                None => bars.len().checked_sub(1)?,
            };
            let closes = series.closes();

            let returns: BTreeMap<usize, Option<f64>> = config
                .horizons
                .iter()
                .map(|&h| (h, trailing_return(&closes, end, h)))
                .collect();
            let available: Vec<f64> = returns.values().flatten().copied().collect();
            let score = (!available.is_empty())
                .then(|| available.iter().sum::<f64>() / available.len() as f64);

            Some(MomentumEntry {
                symbol: series.symbol().to_string(),
                last_close: closes[end],
                returns,
                score,
            })
        })
        .collect();

    entries.sort_by(|a, b| match (a.score, b.score) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.symbol.cmp(&b.symbol)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.symbol.cmp(&b.symbol),
    });

    debug!(instruments = entries.len(), "momentum ranking computed");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::series::tests::{day, series_from_closes};

    fn ramp(symbol: &str, n: usize, from: f64, step: f64) -> PriceSeries {
        let closes: Vec<f64> = (0..n).map(|i| from + step * i as f64).collect();
        series_from_closes(symbol, &closes)
    }

    #[test]
    fn ranks_by_mean_return() {
        let universe = vec![
            ramp("SLOW", 200, 10.0, 0.01),
            ramp("FAST", 200, 10.0, 0.1),
            ramp("DOWN", 200, 40.0, -0.1),
        ];
        let ranking = momentum_ranking(&universe, None, &MomentumConfig::default());
        let order: Vec<&str> = ranking.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["FAST", "SLOW", "DOWN"]);
        assert!(ranking[2].score.unwrap() < 0.0);
        assert_eq!(ranking[0].returns.len(), 3);
    }

    #[test]
    fn short_history_uses_available_horizons() {
        let universe = vec![ramp("NEW", 30, 10.0, 0.1)];
        let entry = &momentum_ranking(&universe, None, &MomentumConfig::default())[0];
        assert!(entry.returns[&21].is_some());
        assert_eq!(entry.returns[&63], None);
        assert_eq!(entry.score, entry.returns[&21]);
    }

    #[test]
    fn as_of_reads_history_only() {
        let universe = vec![ramp("A", 200, 10.0, 0.1)];
        let entry = &momentum_ranking(&universe, Some(day(100)), &MomentumConfig::default())[0];
        assert!((entry.last_close - 20.0).abs() < 1e-9);

        let none = momentum_ranking(&universe, Some(day(-5)), &MomentumConfig::default());
        assert!(none.is_empty());
    }
}
