// =============================================================================
// Analysis — analyzers over an enriched series
// =============================================================================
//
// Every analyzer is a pure function of an `EnrichedSeries` (plus a row and its
// configuration) returning an immutable value. The snapshot builder is the
// only place they are composed.

pub mod breakout;
pub mod correlation;
pub mod divergence;
pub mod fibonacci;
pub mod levels;
pub mod momentum;
pub mod setups;
pub mod trend;

pub use breakout::{BreakoutKind, BreakoutSignal, BreakoutSignals};
pub use divergence::{DivergenceKind, DivergenceReport, Oscillator};
pub use levels::{LevelKind, LevelSource, PriceLevel};
pub use momentum::MomentumEntry;
pub use setups::SetupResult;
pub use trend::{Crossover, TrendDirection, TrendSnapshot, TrendStrength};
