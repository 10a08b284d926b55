// =============================================================================
// Central Application State — batch analysis service
// =============================================================================
//
// Holds the loaded series and the results of the latest batch run so the REST
// API can serve them read-only. Snapshots are immutable once computed and are
// shared as `Arc<MarketSnapshot>`.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::analysis::MomentumEntry;
use crate::market_data::PriceSeries;
use crate::runtime_config::RuntimeConfig;
use crate::snapshot::MarketSnapshot;

// =============================================================================
// Failure Record
// =============================================================================

/// An instrument the last batch could not analyse.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub symbol: String,
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Shared service state, wrapped in `Arc` and handed to every task.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented whenever a batch result is recorded.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Inputs ──────────────────────────────────────────────────────────
    pub series: RwLock<BTreeMap<String, Arc<PriceSeries>>>,

    // ── Results ─────────────────────────────────────────────────────────
    pub snapshots: RwLock<BTreeMap<String, Arc<MarketSnapshot>>>,
    pub failures: RwLock<BTreeMap<String, FailureRecord>>,
    pub momentum: RwLock<Vec<MomentumEntry>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            state_version: AtomicU64::new(0),
            runtime_config: Arc::new(RwLock::new(config)),
            series: RwLock::new(BTreeMap::new()),
            snapshots: RwLock::new(BTreeMap::new()),
            failures: RwLock::new(BTreeMap::new()),
            momentum: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Inputs ──────────────────────────────────────────────────────────

    /// Replace the loaded series; previous results are discarded.
    pub fn set_series(&self, loaded: Vec<PriceSeries>) {
        let map = loaded
            .into_iter()
            .map(|s| (s.symbol().to_string(), Arc::new(s)))
            .collect();
        *self.series.write() = map;
        self.snapshots.write().clear();
        self.failures.write().clear();
        self.momentum.write().clear();
        self.increment_version();
    }

    pub fn series_for(&self, symbol: &str) -> Option<Arc<PriceSeries>> {
        self.series.read().get(symbol).cloned()
    }

    // ── Results ─────────────────────────────────────────────────────────

    pub fn record_snapshot(&self, snapshot: MarketSnapshot) {
        let symbol = snapshot.symbol.clone();
        self.failures.write().remove(&symbol);
        self.snapshots.write().insert(symbol, Arc::new(snapshot));
        self.increment_version();
    }

    pub fn record_failure(&self, symbol: &str, message: String) {
        let record = FailureRecord {
            symbol: symbol.to_string(),
            message,
            at: Utc::now().to_rfc3339(),
        };
        self.snapshots.write().remove(symbol);
        self.failures.write().insert(symbol.to_string(), record);
        self.increment_version();
    }

    pub fn set_momentum(&self, ranking: Vec<MomentumEntry>) {
        *self.momentum.write() = ranking;
        self.increment_version();
    }

    pub fn snapshot(&self, symbol: &str) -> Option<Arc<MarketSnapshot>> {
        self.snapshots.read().get(symbol).cloned()
    }

    /// All snapshots, ordered by symbol.
    pub fn all_snapshots(&self) -> Vec<Arc<MarketSnapshot>> {
        self.snapshots.read().values().cloned().collect()
    }

    pub fn all_failures(&self) -> Vec<FailureRecord> {
        self.failures.read().values().cloned().collect()
    }
}
