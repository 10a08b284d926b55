// =============================================================================
// Setup Engine — named entry setups over a snapshot
// =============================================================================
//
//   TREND FOLLOWING  daily strong uptrend, weekly up (or unknown),
//                    close >= medium EMA, volume >= its average
//   RSI REBOUND      RSI leaves oversold: prev <= oversold < now <= ceiling,
//                    weekly not in a downtrend
//   EMA CROSS        short x medium and medium x long EMA crossings on the
//                    as-of bar, active when the daily trend agrees
//
// Every setup reads only the as-of row and the one before it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::trend::{TrendDirection, TrendSnapshot, TrendStrength};
use crate::config::{AnalysisConfig, SetupConfig};
use crate::enrich::{at, EnrichedSeries};
use crate::error::Result;
use crate::indicators::Column;
use crate::snapshot::MarketSnapshot;

/// Verdict of one named setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupResult {
    pub name: String,
    pub description: String,
    pub active: bool,
    pub details: String,
}

/// Evaluate every setup for `snapshot`, reading the EMA and RSI columns of
/// the daily `series` it was built from.
pub fn evaluate_setups(
    snapshot: &MarketSnapshot,
    series: &EnrichedSeries,
    config: &AnalysisConfig,
) -> Result<Vec<SetupResult>> {
    let row = series.row_of(snapshot.as_of)?;
    let trend = &config.trend;

    let mut results = vec![
        trend_following(snapshot, series.ema(trend.medium_window), row, &config.setups),
        rsi_rebound(&series.rsi, row, snapshot.trend_weekly.as_ref(), &config.setups),
    ];

    for (short, long) in [
        (trend.short_window, trend.medium_window),
        (trend.medium_window, trend.long_window),
    ] {
        if let (Some(a), Some(b)) = (series.ema(short), series.ema(long)) {
            results.extend(ema_cross(short, long, a, b, row, &snapshot.trend_daily));
        }
    }

    debug!(
        symbol = %snapshot.symbol,
        evaluated = results.len(),
        active = results.iter().filter(|r| r.active).count(),
        "setups evaluated"
    );

    Ok(results)
}

fn trend_following(
    snapshot: &MarketSnapshot,
    ema_medium: Option<&Column>,
    row: usize,
    config: &SetupConfig,
) -> SetupResult {
    let daily = &snapshot.trend_daily;
    let daily_strong = daily.direction == TrendDirection::Uptrend && daily.strength == TrendStrength::Strong;
    let weekly_up = snapshot.trend_weekly.map_or(true, |w| {
        w.direction == TrendDirection::Uptrend
            && matches!(w.strength, TrendStrength::Moderate | TrendStrength::Strong)
    });
    let above_ema = ema_medium
        .and_then(|c| at(c, row))
        .is_some_and(|ema| snapshot.close >= ema);
    let volume_ok = snapshot
        .volume_ratio
        .is_some_and(|r| r >= config.min_volume_ratio);

    let active = daily_strong && weekly_up && above_ema && volume_ok;
    SetupResult {
        name: "Trend Following".into(),
        description: "Seguir tendência em alta com pullback raso.".into(),
        active,
        details: if active {
            "Tendência diária/semanal favorável, preço acima da EMA média e volume acima da média."
        } else {
            "Requer tendência forte, preço acima da EMA média e volume em linha com a média."
        }
        .into(),
    }
}

fn rsi_rebound(
    rsi: &[Option<f64>],
    row: usize,
    weekly: Option<&TrendSnapshot>,
    config: &SetupConfig,
) -> SetupResult {
    let name = "RSI Rebound".to_string();
    let description = format!("Compra quando o RSI reacelera acima de {:.0}.", config.rsi_oversold);

    let (Some(now), Some(prev)) = (at(rsi, row), row.checked_sub(1).and_then(|p| at(rsi, p))) else {
        return SetupResult {
            name,
            description,
            active: false,
            details: "RSI insuficiente para avaliar cruzamento.".into(),
        };
    };

    let crossed_up = prev <= config.rsi_oversold
        && now > config.rsi_oversold
        && now <= config.rsi_rebound_ceiling;
    let weekly_ok = weekly.map_or(true, |w| w.direction != TrendDirection::Downtrend);

    let active = crossed_up && weekly_ok;
    SetupResult {
        name,
        description,
        active,
        details: if active {
            "RSI saiu da zona de sobrevenda e o semanal não está em baixa."
        } else {
            "Aguardando RSI cruzar a sobrevenda ou melhora da tendência semanal."
        }
        .into(),
    }
}

/// Crossing of the `short` EMA through the `long` EMA on `row`. Empty when
/// neither a crossing happened nor both bars are defined.
fn ema_cross(
    short_window: usize,
    long_window: usize,
    short: &[Option<f64>],
    long: &[Option<f64>],
    row: usize,
    daily: &TrendSnapshot,
) -> Vec<SetupResult> {
    let diff = |i: usize| Some(at(short, i)? - at(long, i)?);
    let (Some(now), Some(prev)) = (diff(row), row.checked_sub(1).and_then(diff)) else {
        return Vec::new();
    };

    let pair = format!("EMA Cross ({short_window} x {long_window})");
    let mut results = Vec::new();

    if prev <= 0.0 && now > 0.0 {
        let active = daily.direction == TrendDirection::Uptrend && daily.strength != TrendStrength::None;
        results.push(SetupResult {
            name: format!("{pair} compra"),
            description: format!("EMA {short_window} cruzando acima da EMA {long_window}."),
            active,
            details: if active {
                "Cruzamento de compra confirmado pela tendência diária."
            } else {
                "Cruzamento de compra, mas a tendência diária não favorece."
            }
            .into(),
        });
    }

    if prev >= 0.0 && now < 0.0 {
        let active = daily.direction == TrendDirection::Downtrend && daily.strength != TrendStrength::None;
        results.push(SetupResult {
            name: format!("{pair} venda"),
            description: format!("EMA {short_window} cruzando abaixo da EMA {long_window}."),
            active,
            details: if active {
                "Cruzamento de venda alinhado à tendência diária."
            } else {
                "Cruzamento de venda, porém a tendência diária não está em baixa."
            }
            .into(),
        });
    }

    results
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::trend::Crossover;
    use crate::enrich::tests::{flat_series, linear_series};
    use crate::market_data::series::tests::day;
    use crate::snapshot::analyze;

    fn trend(direction: TrendDirection, strength: TrendStrength) -> TrendSnapshot {
        TrendSnapshot {
            direction,
            strength,
            slope_short: 0.0,
            slope_medium: 0.0,
            slope_long: 0.0,
            crossover: Crossover::Mixed,
        }
    }

    #[test]
    fn upward_cross_confirmed_by_daily_trend() {
        let short = vec![None, Some(9.8), Some(10.3)];
        let long = vec![None, Some(10.0), Some(10.1)];
        let up = trend(TrendDirection::Uptrend, TrendStrength::Moderate);

        let results = ema_cross(9, 21, &short, &long, 2, &up);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "EMA Cross (9 x 21) compra");
        assert!(results[0].active);

        let down = trend(TrendDirection::Downtrend, TrendStrength::Strong);
        let results = ema_cross(9, 21, &short, &long, 2, &down);
        assert!(!results[0].active);
    }

    #[test]
    fn downward_cross_is_a_sell() {
        let short = vec![Some(10.2), Some(9.9)];
        let long = vec![Some(10.0), Some(10.0)];
        let down = trend(TrendDirection::Downtrend, TrendStrength::Strong);
        let results = ema_cross(21, 72, &short, &long, 1, &down);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "EMA Cross (21 x 72) venda");
        assert!(results[0].active);
    }

    #[test]
    fn no_cross_no_result() {
        let short = vec![Some(11.0), Some(11.5)];
        let long = vec![Some(10.0), Some(10.2)];
        let up = trend(TrendDirection::Uptrend, TrendStrength::Strong);
        assert!(ema_cross(9, 21, &short, &long, 1, &up).is_empty());
        // Warmup on the previous bar.
        assert!(ema_cross(9, 21, &[None, Some(1.0)], &[None, Some(0.5)], 1, &up).is_empty());
    }

    #[test]
    fn rsi_leaving_oversold() {
        let cfg = SetupConfig::default();
        let rsi = vec![Some(28.0), Some(33.0)];
        assert!(rsi_rebound(&rsi, 1, None, &cfg).active);

        let down = trend(TrendDirection::Downtrend, TrendStrength::Moderate);
        assert!(!rsi_rebound(&rsi, 1, Some(&down), &cfg).active);

        // Jumped past the ceiling.
        assert!(!rsi_rebound(&[Some(28.0), Some(50.0)], 1, None, &cfg).active);

        let short = rsi_rebound(&[Some(28.0)], 0, None, &cfg);
        assert!(!short.active);
        assert!(short.details.contains("insuficiente"));
    }

    #[test]
    fn linear_rise_follows_the_trend() {
        let snap = analyze(&linear_series(300, 10.0, 40.0), &[], day(299), &AnalysisConfig::default())
            .unwrap();
        let names: Vec<(&str, bool)> = snap
            .setups
            .iter()
            .map(|s| (s.name.as_str(), s.active))
            .collect();
        assert_eq!(names, vec![("Trend Following", true), ("RSI Rebound", false)]);
    }

    #[test]
    fn flat_series_triggers_nothing() {
        let snap = analyze(&flat_series(250, 25.0), &[], day(249), &AnalysisConfig::default()).unwrap();
        assert_eq!(snap.setups.len(), 2);
        assert!(snap.setups.iter().all(|s| !s.active));
    }
}
