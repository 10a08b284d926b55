// =============================================================================
// MACD — Moving Average Convergence/Divergence
// =============================================================================
//
//   line      = EMA(fast) - EMA(slow)
//   signal    = EMA(signal_period) of the line
//   histogram = line - signal
//
// With the default 12/26/9 the line is defined from row 25 and the
// signal/histogram from row 33.

use serde::{Deserialize, Serialize};

use super::ema::calculate_ema;
use super::{align, Column};

/// The three MACD columns, aligned to the input rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdColumns {
    pub line: Column,
    pub signal: Column,
    pub histogram: Column,
}

pub fn macd_columns(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdColumns {
    let len = closes.len();
    let empty = || MacdColumns {
        line: vec![None; len],
        signal: vec![None; len],
        histogram: vec![None; len],
    };
    if fast == 0 || slow == 0 || signal_period == 0 || fast >= slow || len < slow {
        return empty();
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    // ema_fast starts at row fast-1, ema_slow at row slow-1.
    let skip = slow - fast;
    let line: Vec<f64> = ema_slow
        .iter()
        .zip(ema_fast.iter().skip(skip))
        .map(|(s, f)| f - s)
        .collect();

    let line_offset = slow - 1;
    let signal = calculate_ema(&line, signal_period);
    let signal_offset = line_offset + signal_period - 1;
    let histogram: Vec<f64> = signal
        .iter()
        .zip(line.iter().skip(signal_period - 1))
        .map(|(s, l)| l - s)
        .collect();

    MacdColumns {
        line: align(line, line_offset, len),
        signal: align(signal, signal_offset, len),
        histogram: align(histogram, signal_offset, len),
    }
}
