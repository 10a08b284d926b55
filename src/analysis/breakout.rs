// =============================================================================
// Breakout Signals
// =============================================================================
//
// Against the swing high nearest the close (resistance) and the swing low
// nearest the close (support):
//
//   BREAKOUT_UP          close > resistance * (1 + tol)
//   FALSE_BREAKOUT_UP    close < resistance and previous close > resistance
//   BREAKOUT_DOWN        close < support * (1 - tol)
//   FALSE_BREAKOUT_DOWN  close > support and previous close < support

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::levels::{SwingPoint, SwingType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutKind {
    BreakoutUp,
    FalseBreakoutUp,
    BreakoutDown,
    FalseBreakoutDown,
}

impl std::fmt::Display for BreakoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BreakoutUp => write!(f, "BREAKOUT_UP"),
            Self::FalseBreakoutUp => write!(f, "FALSE_BREAKOUT_UP"),
            Self::BreakoutDown => write!(f, "BREAKOUT_DOWN"),
            Self::FalseBreakoutDown => write!(f, "FALSE_BREAKOUT_DOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutSignal {
    pub kind: BreakoutKind,
    pub price: f64,
    pub reference_level: f64,
    pub date: NaiveDate,
}

/// Signals raised at one row; at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakoutSignals {
    pub breakout_up: Option<BreakoutSignal>,
    pub false_breakout_up: Option<BreakoutSignal>,
    pub breakout_down: Option<BreakoutSignal>,
    pub false_breakout_down: Option<BreakoutSignal>,
}

impl BreakoutSignals {
    pub fn active(&self) -> Vec<BreakoutSignal> {
        [
            self.breakout_up,
            self.false_breakout_up,
            self.breakout_down,
            self.false_breakout_down,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn nearest(pivots: &[SwingPoint], kind: SwingType, close: f64) -> Option<f64> {
    pivots
        .iter()
        .filter(|p| p.kind == kind)
        .map(|p| p.price)
        .min_by(|a, b| (a - close).abs().total_cmp(&(b - close).abs()))
}

/// Breakout signals for `close` (with `previous_close` one bar earlier).
pub fn breakout_signals(
    pivots: &[SwingPoint],
    close: f64,
    previous_close: Option<f64>,
    date: NaiveDate,
    tolerance_pct: f64,
) -> BreakoutSignals {
    let tol = tolerance_pct / 100.0;
    let signal = |kind, reference_level| BreakoutSignal {
        kind,
        price: close,
        reference_level,
        date,
    };
    let mut out = BreakoutSignals::default();

    if let Some(resistance) = nearest(pivots, SwingType::High, close) {
        if close > resistance * (1.0 + tol) {
            out.breakout_up = Some(signal(BreakoutKind::BreakoutUp, resistance));
        }
        if close < resistance && previous_close.is_some_and(|p| p > resistance) {
            out.false_breakout_up = Some(signal(BreakoutKind::FalseBreakoutUp, resistance));
        }
    }

    if let Some(support) = nearest(pivots, SwingType::Low, close) {
        if close < support * (1.0 - tol) {
            out.breakout_down = Some(signal(BreakoutKind::BreakoutDown, support));
        }
        if close > support && previous_close.is_some_and(|p| p < support) {
            out.false_breakout_down = Some(signal(BreakoutKind::FalseBreakoutDown, support));
        }
    }

    out
}
