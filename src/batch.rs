// =============================================================================
// Batch Runner — load, analyse and rank every configured instrument
// =============================================================================
//
// The analysis itself is synchronous and pure, so each instrument runs on a
// blocking worker; a semaphore bounds how many run at once. One instrument
// failing never aborts the batch: the error is recorded against its symbol.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::analysis::momentum::momentum_ranking;
use crate::app_state::AppState;
use crate::enrich::enrich;
use crate::features::export_features;
use crate::market_data::loader::load_dir;
use crate::market_data::PriceSeries;
use crate::snapshot::{analyze, MarketSnapshot};

/// Outcome counts of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub analysed: usize,
    pub failed: usize,
    pub elapsed_ms: u128,
}

/// Load the data directory into `state` and run the batch over it.
pub async fn load_and_run(state: Arc<AppState>) -> Result<BatchReport> {
    let (data_dir, wanted) = {
        let config = state.runtime_config.read();
        let wanted: Vec<String> = if config.symbols.is_empty() {
            Vec::new()
        } else {
            config
                .symbols
                .iter()
                .chain(&config.reference_symbols)
                .cloned()
                .collect()
        };
        (config.data_dir.clone(), wanted)
    };

    let loaded = tokio::task::spawn_blocking(move || load_dir(&data_dir, &wanted))
        .await
        .context("loader task panicked")??;
    state.set_series(loaded.series);
    for (symbol, error) in loaded.failures {
        state.record_failure(&symbol, format!("{error:#}"));
    }

    run_batch(state).await
}

/// Compute a snapshot for every target instrument and the momentum ranking.
pub async fn run_batch(state: Arc<AppState>) -> Result<BatchReport> {
    let started = Instant::now();
    let config = state.runtime_config.read().clone();
    let all: Vec<Arc<PriceSeries>> = state.series.read().values().cloned().collect();

    let reference_set: BTreeSet<&str> = config.reference_symbols.iter().map(String::as_str).collect();
    let references: Arc<Vec<PriceSeries>> = Arc::new(
        all.iter()
            .filter(|s| reference_set.contains(s.symbol()))
            .map(|s| (**s).clone())
            .collect(),
    );
    let targets: Vec<Arc<PriceSeries>> = if config.symbols.is_empty() {
        all.clone()
    } else {
        all.iter()
            .filter(|s| config.symbols.iter().any(|t| t == s.symbol()))
            .cloned()
            .collect()
    };

    let rejected: BTreeSet<String> = state.failures.read().keys().cloned().collect();
    for missing in config
        .symbols
        .iter()
        .filter(|t| !all.iter().any(|s| s.symbol() == t.as_str()))
        .filter(|t| !rejected.contains(t.as_str()))
    {
        warn!(symbol = %missing, "configured symbol has no data file");
        state.record_failure(missing, "no data file".to_string());
    }

    info!(
        targets = targets.len(),
        references = references.len(),
        workers = config.workers,
        "batch starting"
    );

    let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
    let mut handles = Vec::with_capacity(targets.len());

    for series in &targets {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("worker semaphore closed")?;
        let series = series.clone();
        let references = references.clone();
        let analysis = config.analysis.clone();
        let feature_dir = config.feature_dir.clone();
        let as_of = config.as_of;

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let symbol = series.symbol().to_string();
            let Some(as_of) = as_of.or_else(|| series.last().map(|b| b.date)) else {
                return (symbol, Err("series is empty".to_string()));
            };

            let result: std::result::Result<MarketSnapshot, String> =
                analyze(&series, &references, as_of, &analysis).map_err(|e| e.to_string());

            if let (Ok(_), Some(dir)) = (&result, feature_dir) {
                let exported = series
                    .truncated_at(as_of)
                    .and_then(|h| enrich(&h, &analysis.indicators))
                    .map_err(anyhow::Error::from)
                    .and_then(|e| export_features(&e, &dir));
                if let Err(e) = exported {
                    warn!(symbol = %symbol, error = %format!("{e:#}"), "feature export failed");
                }
            }

            (symbol, result)
        }));
    }

    let (mut analysed, mut failed) = (0, 0);
    for handle in handles {
        let (symbol, result) = handle.await.context("analysis task panicked")?;
        match result {
            Ok(snapshot) => {
                debug!(symbol = %symbol, "snapshot recorded");
                state.record_snapshot(snapshot);
                analysed += 1;
            }
            Err(message) => {
                warn!(symbol = %symbol, error = %message, "instrument skipped");
                state.record_failure(&symbol, message);
                failed += 1;
            }
        }
    }

    let universe: Vec<PriceSeries> = targets.iter().map(|s| (**s).clone()).collect();
    state.set_momentum(momentum_ranking(&universe, config.as_of, &config.analysis.momentum));

    let report = BatchReport {
        analysed,
        failed,
        elapsed_ms: started.elapsed().as_millis(),
    };
    info!(
        analysed = report.analysed,
        failed = report.failed,
        elapsed_ms = report.elapsed_ms as u64,
        "batch complete"
    );
    Ok(report)
}
