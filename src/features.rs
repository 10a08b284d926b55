// =============================================================================
// ML Feature Export
// =============================================================================
//
// Reshapes enriched columns into a flat training table. Nothing is fitted
// here. Forward-return targets are the only look-ahead values in the crate
// and they exist only in this table, never in `EnrichedSeries`.
//
//   dist_sma200_pct  = (close / SMA200 - 1) * 100
//   bb_width         = (upper_2 - lower_2) / close
//   weekly_rsi       = last daily RSI of the previous completed ISO week
//   ret_h            = close_t / close_{t-h} - 1          h in {1, 5, 21}
//   fwd_ret_h        = close_{t+h} / close_t - 1          h in {5, 21}

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::enrich::{at, EnrichedSeries};
use crate::indicators::returns::simple_return_column;
use crate::indicators::Column;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub close: f64,
    pub dist_sma200_pct: Option<f64>,
    pub bb_width: Option<f64>,
    pub weekly_rsi: Option<f64>,
    pub ret_1: Option<f64>,
    pub ret_5: Option<f64>,
    pub ret_21: Option<f64>,
    pub fwd_ret_5: Option<f64>,
    pub fwd_ret_21: Option<f64>,
}

fn forward_return_column(closes: &[f64], horizon: usize) -> Column {
    (0..closes.len())
        .map(|i| {
            let future = *closes.get(i + horizon)?;
            (closes[i] != 0.0).then(|| future / closes[i] - 1.0)
        })
        .collect()
}

/// Last daily RSI of the previous completed ISO week, per row.
fn weekly_rsi_column(series: &EnrichedSeries) -> Column {
    let mut out = Vec::with_capacity(series.len());
    let mut current_week = None;
    let mut last_in_week: Option<f64> = None;
    let mut previous_week: Option<f64> = None;

    for (i, bar) in series.bars.iter().enumerate() {
        let iso = bar.date.iso_week();
        let key = (iso.year(), iso.week());
        if current_week != Some(key) {
            if current_week.is_some() {
                previous_week = last_in_week;
            }
            current_week = Some(key);
        }
        out.push(previous_week);
        last_in_week = at(&series.rsi, i);
    }
    out
}

/// One feature row per enriched row.
pub fn build_features(series: &EnrichedSeries) -> Vec<FeatureRow> {
    let closes = series.closes();
    let sma200 = series.sma(200);
    let band = series.bollinger(2.0);
    let weekly_rsi = weekly_rsi_column(series);
    let ret_1 = simple_return_column(&closes, 1);
    let ret_5 = simple_return_column(&closes, 5);
    let ret_21 = simple_return_column(&closes, 21);
    let fwd_5 = forward_return_column(&closes, 5);
    let fwd_21 = forward_return_column(&closes, 21);

    series
        .bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let close = bar.close;
            let dist_sma200_pct = sma200
                .and_then(|c| at(c, i))
                .filter(|s| *s != 0.0)
                .map(|s| (close / s - 1.0) * 100.0);
            let bb_width = band.and_then(|b| {
                let width = at(&b.upper, i)? - at(&b.lower, i)?;
                (close != 0.0).then(|| width / close)
            });
            FeatureRow {
                date: bar.date,
                close,
                dist_sma200_pct,
                bb_width,
                weekly_rsi: weekly_rsi[i],
                ret_1: ret_1[i],
                ret_5: ret_5[i],
                ret_21: ret_21[i],
                fwd_ret_5: fwd_5[i],
                fwd_ret_21: fwd_21[i],
            }
        })
        .collect()
}

/// Write `rows` as CSV with a header line.
pub fn write_features_csv<W: Write>(rows: &[FeatureRow], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row).context("failed to serialise feature row")?;
    }
    csv.flush().context("failed to flush feature CSV")?;
    Ok(())
}

/// Build the feature table of `series` and write it to `dir/<SYMBOL>_features.csv`.
pub fn export_features(series: &EnrichedSeries, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create feature directory {}", dir.display()))?;
    let path = dir.join(format!("{}_features.csv", series.symbol));

    let rows = build_features(series);
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_features_csv(&rows, file)?;

    info!(symbol = %series.symbol, rows = rows.len(), path = %path.display(), "features exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;
    use crate::enrich::enrich;
    use crate::enrich::tests::linear_series;

    fn enriched() -> EnrichedSeries {
        enrich(&linear_series(260, 10.0, 36.0), &IndicatorConfig::default()).unwrap()
    }

    #[test]
    fn forward_targets_stop_at_the_end() {
        let rows = build_features(&enriched());
        assert_eq!(rows.len(), 260);
        assert!(rows[254].fwd_ret_5.is_some());
        assert!(rows[255].fwd_ret_5.is_none());
        assert!(rows[238].fwd_ret_21.is_some());
        assert!(rows[239].fwd_ret_21.is_none());
        assert!(rows[0].ret_1.is_none() && rows[1].ret_1.is_some());
    }

    #[test]
    fn trend_features() {
        let rows = build_features(&enriched());
        let last = rows.last().unwrap();
        assert!(last.dist_sma200_pct.unwrap() > 0.0);
        assert!(last.bb_width.unwrap() > 0.0);
        assert!(rows[198].dist_sma200_pct.is_none());
    }

    #[test]
    fn weekly_rsi_uses_previous_week_only() {
        let e = enriched();
        let rows = build_features(&e);
        // day(0) is Monday 2023-01-02; the first week has no predecessor.
        assert!(rows[..7].iter().all(|r| r.weekly_rsi.is_none()));
        // Monday of week 31 sees Sunday of week 30.
        assert_eq!(rows[210].weekly_rsi, at(&e.rsi, 209));
        assert_eq!(rows[213].weekly_rsi, at(&e.rsi, 209));
    }

    #[test]
    fn weekly_rsi_follows_warmup() {
        let e = enriched();
        let rows = build_features(&e);
        // RSI(14) is defined from row 14: weeks ending on rows 6 and 13 carry
        // nothing forward, the week ending on row 20 does.
        assert!(rows[7..21].iter().all(|r| r.weekly_rsi.is_none()));
        assert!(at(&e.rsi, 20).is_some());
        assert!(rows[21..28].iter().all(|r| r.weekly_rsi == at(&e.rsi, 20)));
    }

    #[test]
    fn csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_features(&enriched(), dir.path()).unwrap();
        assert!(path.ends_with("LINEAR_features.csv"));

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,close,dist_sma200_pct,bb_width,weekly_rsi,ret_1,ret_5,ret_21,fwd_ret_5,fwd_ret_21"
        );
        assert!(lines.next().unwrap().starts_with("2023-01-02,10"));
        assert_eq!(text.lines().count(), 261);
    }
}
