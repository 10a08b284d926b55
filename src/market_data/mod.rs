pub mod loader;
pub mod series;
pub mod weekly;

// Re-export the core types for convenient access (e.g. `use crate::market_data::PriceSeries`).
pub use series::{PriceBar, PriceField, PriceSeries};
pub use weekly::resample_weekly;
