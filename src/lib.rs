// =============================================================================
// quantfinance — indicator enrichment and market snapshot pipeline
// =============================================================================
//
// Data flow:
//
//   PriceSeries ─► enrich ─► EnrichedSeries ─┬─► levels     ─┐
//                                            ├─► trend       ├─► build_snapshot ─► MarketSnapshot ─► summarise
//                                            └─► divergence ─┘
//
// The library is synchronous and pure; `batch`, `app_state` and `api` wrap it
// into a service.

pub mod analysis;
pub mod api;
pub mod app_state;
pub mod batch;
pub mod config;
pub mod enrich;
pub mod error;
pub mod features;
pub mod indicators;
pub mod market_data;
pub mod runtime_config;
pub mod snapshot;
pub mod summary;

pub use config::AnalysisConfig;
pub use enrich::{enrich, EnrichedSeries};
pub use error::{AnalysisError, Result};
pub use market_data::{PriceBar, PriceField, PriceSeries};
pub use snapshot::{analyze, build_snapshot, MarketSnapshot};
pub use summary::summarise;
