// =============================================================================
// Fibonacci Retracements & Extensions
// =============================================================================
//
// The leg is anchored on the most recent confirmed swing point and the most
// extreme opposite pivot that precedes it inside the lookback:
//
//   up-leg   (low L -> high H):  retracement = H - (H-L)*r
//                                extension   = L + (H-L)*e
//   down-leg (high H -> low L):  retracement = L + (H-L)*r
//                                extension   = H - (H-L)*e
//
// Non-positive prices are dropped (deep extensions of a down-leg).

use serde::{Deserialize, Serialize};

use super::levels::{SwingPoint, SwingType};

/// A swing-low-to-swing-high leg or its inverse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingLeg {
    pub start: SwingPoint,
    pub end: SwingPoint,
}

impl SwingLeg {
    pub fn is_up(&self) -> bool {
        self.end.kind == SwingType::High
    }

    pub fn high(&self) -> f64 {
        self.start.price.max(self.end.price)
    }

    pub fn low(&self) -> f64 {
        self.start.price.min(self.end.price)
    }
}

/// The most recent significant leg among `pivots` (sorted by row).
pub fn latest_leg(pivots: &[SwingPoint]) -> Option<SwingLeg> {
    let end = *pivots.last()?;
    let opposite = pivots[..pivots.len() - 1]
        .iter()
        .filter(|p| p.kind != end.kind);

    let start = match end.kind {
        SwingType::High => opposite.min_by(|a, b| a.price.total_cmp(&b.price)),
        SwingType::Low => opposite.max_by(|a, b| a.price.total_cmp(&b.price)),
    }?;

    (start.price != end.price).then_some(SwingLeg { start: *start, end })
}

/// Retracement then extension prices of `leg`.
pub fn fibonacci_levels(leg: &SwingLeg, retracements: &[f64], extensions: &[f64]) -> Vec<f64> {
    let (high, low) = (leg.high(), leg.low());
    let diff = high - low;

    let (retrace, extend): (Vec<f64>, Vec<f64>) = if leg.is_up() {
        (
            retracements.iter().map(|r| high - diff * r).collect(),
            extensions.iter().map(|e| low + diff * e).collect(),
        )
    } else {
        (
            retracements.iter().map(|r| low + diff * r).collect(),
            extensions.iter().map(|e| high - diff * e).collect(),
        )
    };

    retrace
        .into_iter()
        .chain(extend)
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect()
}
