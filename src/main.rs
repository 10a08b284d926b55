// =============================================================================
// quantfinance — Batch Analysis Service
// =============================================================================
//
// Loads every normalised OHLCV file in the data directory, builds a market
// snapshot per instrument, prints the Portuguese summaries and, when asked,
// keeps serving the results over HTTP until Ctrl+C.
// =============================================================================

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use quantfinance::app_state::AppState;
use quantfinance::runtime_config::RuntimeConfig;
use quantfinance::{api, batch, summarise};

const DEFAULT_CONFIG_PATH: &str = "quantfinance.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("QF_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        let defaults = RuntimeConfig::default();
        // First run: leave an editable file behind.
        if !std::path::Path::new(&config_path).exists() {
            if let Err(e) = defaults.save(&config_path) {
                warn!(error = %e, "Failed to write default config");
            }
        }
        defaults
    });
    config.apply_overrides(|key| std::env::var(key).ok());

    info!(
        data_dir = %config.data_dir.display(),
        symbols = ?config.symbols,
        references = ?config.reference_symbols,
        as_of = ?config.as_of,
        price_field = %config.analysis.indicators.price_field,
        "quantfinance starting"
    );

    // ── 2. Batch ─────────────────────────────────────────────────────────
    let serve = config.serve;
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config));

    let report = batch::load_and_run(state.clone()).await?;

    for snapshot in state.all_snapshots() {
        println!("{}", summarise(&snapshot));
    }
    for failure in state.all_failures() {
        warn!(symbol = %failure.symbol, error = %failure.message, "no snapshot");
    }
    let top: Vec<String> = state
        .momentum
        .read()
        .iter()
        .take(10)
        .map(|e| match e.score {
            Some(s) => format!("{} {:+.2}%", e.symbol, s * 100.0),
            None => format!("{} n/d", e.symbol),
        })
        .collect();
    info!(top = ?top, "momentum ranking");

    if !serve {
        info!(analysed = report.analysed, failed = report.failed, "done");
        return Ok(());
    }

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!(error = %e, "API server failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Shutdown signal received — stopping gracefully");
        }
    }

    info!("quantfinance shut down complete.");
    Ok(())
}
