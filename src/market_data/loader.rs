// =============================================================================
// Normalised OHLCV Loader
// =============================================================================
//
// Reads the normalised table the ingestion collaborators produce:
//
//   date,open,high,low,close,adjusted_close,volume,trade_count
//
// Header names are matched case-insensitively; `adjusted_close` and
// `trade_count` are optional. Dates are ISO (`2024-01-31`) or day-first
// (`31/01/2024`, as exported by the trading terminal).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::series::{PriceBar, PriceSeries};
use crate::error::AnalysisError;

#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    adjusted_close: Option<f64>,
    volume: f64,
    #[serde(default)]
    trade_count: Option<f64>,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Some exports carry a time component; only the calendar day matters.
    let day_part = raw.split([' ', 'T']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day_part, "%d/%m/%Y"))
        .ok()
}

fn count_field(date: NaiveDate, name: &str, value: f64) -> std::result::Result<u64, AnalysisError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalysisError::MalformedBar {
            date,
            reason: format!("{name} must be a non-negative number, got {value}"),
        });
    }
    Ok(value.round() as u64)
}

impl RawRow {
    fn into_bar(self) -> Result<PriceBar> {
        let date = parse_date(&self.date)
            .with_context(|| format!("unparseable date {:?}", self.date))?;
        let volume = count_field(date, "volume", self.volume)?;
        let trade_count = self
            .trade_count
            .map(|t| count_field(date, "trade_count", t))
            .transpose()?;
        Ok(PriceBar {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            adjusted_close: self.adjusted_close.unwrap_or(self.close),
            volume,
            trade_count,
        })
    }
}

/// Parse a normalised OHLCV table from any reader.
pub fn read_series<R: std::io::Read>(symbol: &str, reader: R) -> Result<PriceSeries> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: csv::StringRecord = csv_reader
        .headers()
        .context("failed to read CSV headers")?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    csv_reader.set_headers(headers);

    let mut bars = Vec::new();
    for (line, record) in csv_reader.deserialize::<RawRow>().enumerate() {
        let row = record.with_context(|| format!("{symbol}: bad CSV row {}", line + 2))?;
        bars.push(row.into_bar().with_context(|| format!("{symbol}: row {}", line + 2))?);
    }

    bars.sort_by_key(|b| b.date);
    let series = PriceSeries::new(symbol, bars)
        .with_context(|| format!("{symbol}: invalid price series"))?;

    debug!(symbol, rows = series.len(), "price series loaded");
    Ok(series)
}

/// Load a single CSV file; the symbol is the upper-cased file stem.
pub fn load_file(path: impl AsRef<Path>) -> Result<PriceSeries> {
    let path = path.as_ref();
    let symbol = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .with_context(|| format!("cannot derive symbol from {}", path.display()))?;
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_series(&symbol, file)
}

/// Outcome of loading a data directory.
#[derive(Debug, Default)]
pub struct DirLoad {
    pub series: Vec<PriceSeries>,
    /// Symbol and error of every wanted file that failed to load.
    pub failures: Vec<(String, anyhow::Error)>,
}

/// Load every `*.csv` in `dir`, optionally restricted to `symbols`.
///
/// A file that fails to parse or validate does not block the rest of the
/// directory; its error is returned against its symbol instead.
pub fn load_dir(dir: impl AsRef<Path>, symbols: &[String]) -> Result<DirLoad> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read data directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    paths.sort();

    let mut loaded = DirLoad::default();
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let wanted = symbols.is_empty() || symbols.iter().any(|s| s.eq_ignore_ascii_case(stem));
        if !wanted {
            continue;
        }
        match load_file(&path) {
            Ok(s) => loaded.series.push(s),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "series rejected");
                loaded.failures.push((stem.to_uppercase(), e));
            }
        }
    }

    info!(
        dir = %dir.display(),
        instruments = loaded.series.len(),
        rejected = loaded.failures.len(),
        "data directory loaded"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close,Adjusted_Close,Volume,Trade_Count
2024-01-03,10.0,10.5,9.8,10.2,10.1,1500,12
2024-01-02,9.9,10.1,9.7,10.0,9.9,1000,
";

    #[test]
    fn reads_and_sorts_rows() {
        let series = read_series("PETR4", SAMPLE.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        let first = &series.bars()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(first.trade_count, None);
        assert_eq!(series.bars()[1].trade_count, Some(12));
        assert!((series.bars()[1].adjusted_close - 10.1).abs() < 1e-12);
    }

    #[test]
    fn adjusted_close_defaults_to_close() {
        let csv = "date,open,high,low,close,volume\n31/01/2024,5,6,4,5.5,10\n";
        let series = read_series("B3SA3", csv.as_bytes()).unwrap();
        let bar = &series.bars()[0];
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(bar.adjusted_close, 5.5);
    }

    #[test]
    fn negative_volume_is_malformed() {
        let csv = "date,open,high,low,close,volume\n2024-01-02,5,6,4,5.5,-10\n";
        let err = read_series("X", csv.as_bytes()).unwrap_err();
        let analysis = err.downcast_ref::<AnalysisError>();
        assert!(matches!(analysis, Some(AnalysisError::MalformedBar { .. })));
    }

    #[test]
    fn broken_ohlc_is_rejected() {
        let csv = "date,open,high,low,close,volume\n2024-01-02,5,4,6,5.5,10\n";
        let err = read_series("X", csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("malformed bar at 2024-01-02"));
    }

    #[test]
    fn load_dir_filters_symbols() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("petr4.csv"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("vale3.csv"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let all = load_dir(dir.path(), &[]).unwrap();
        assert_eq!(all.series.len(), 2);
        assert!(all.failures.is_empty());

        let only = load_dir(dir.path(), &["VALE3".to_string()]).unwrap();
        assert_eq!(only.series.len(), 1);
        assert_eq!(only.series[0].symbol(), "VALE3");
    }

    #[test]
    fn load_dir_returns_rejected_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("petr4.csv"), SAMPLE).unwrap();
        std::fs::write(
            dir.path().join("bad3.csv"),
            "date,open,high,low,close,volume\n2024-01-02,10,9,11,10,100\n",
        )
        .unwrap();

        let loaded = load_dir(dir.path(), &[]).unwrap();
        assert_eq!(loaded.series.len(), 1);
        assert_eq!(loaded.failures.len(), 1);
        let (symbol, err) = &loaded.failures[0];
        assert_eq!(symbol, "BAD3");
        assert!(format!("{err:#}").contains("malformed bar at 2024-01-02"));

        let skipped = load_dir(dir.path(), &["PETR4".to_string()]).unwrap();
        assert!(skipped.failures.is_empty());
    }
}
