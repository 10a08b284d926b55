// =============================================================================
// Runtime Configuration — batch service settings with atomic save
// =============================================================================
//
// Where the service reads its series, which instruments it analyses, and the
// full `AnalysisConfig` handed to the library.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AnalysisConfig;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_reference_symbols() -> Vec<String> {
    vec!["IBOV".to_string(), "USDBRL".to_string()]
}

fn default_workers() -> usize {
    4
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration of the batch analysis service.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Inputs ---------------------------------------------------------------

    /// Directory of normalised `<SYMBOL>.csv` files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Instruments to analyse; empty means every CSV in `data_dir`.
    #[serde(default)]
    pub symbols: Vec<String>,

    /// Instruments every snapshot is correlated against.
    #[serde(default = "default_reference_symbols")]
    pub reference_symbols: Vec<String>,

    /// Snapshot date; unset means each instrument's last session.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,

    // --- Execution ------------------------------------------------------------

    /// Upper bound on snapshots computed concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Keep serving the results over HTTP after the batch completes.
    #[serde(default)]
    pub serve: bool,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Write `<SYMBOL>_features.csv` here when set.
    #[serde(default)]
    pub feature_dir: Option<PathBuf>,

    // --- Analysis -------------------------------------------------------------

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            symbols: Vec::new(),
            reference_symbols: default_reference_symbols(),
            as_of: None,
            workers: default_workers(),
            serve: false,
            bind_addr: default_bind_addr(),
            feature_dir: None,
            analysis: AnalysisConfig::default(),
        }
    }
}

fn symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            data_dir = %config.data_dir.display(),
            symbols = ?config.symbols,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `QF_*` overrides from `lookup` (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("QF_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("QF_SYMBOLS") {
            self.symbols = symbol_list(&raw);
        }
        if let Some(raw) = lookup("QF_REFERENCE_SYMBOLS") {
            self.reference_symbols = symbol_list(&raw);
        }
        if let Some(raw) = lookup("QF_AS_OF") {
            match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => self.as_of = Some(date),
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid QF_AS_OF"),
            }
        }
        if let Some(raw) = lookup("QF_WORKERS") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.workers = n,
                _ => warn!(value = %raw, "ignoring invalid QF_WORKERS"),
            }
        }
        if let Some(addr) = lookup("QF_BIND_ADDR") {
            self.bind_addr = addr;
            self.serve = true;
        }
        if let Some(dir) = lookup("QF_FEATURE_DIR") {
            self.feature_dir = Some(PathBuf::from(dir));
        }
    }
}
