// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicator catalogue. Every
// column-producing function returns one value per input row, `None` wherever
// the indicator's window is not yet fully available (never zero), and reads
// only rows at or before the one it fills (swing flags excepted, see
// `extrema`).

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod extrema;
pub mod macd;
pub mod obv;
pub mod returns;
pub mod rsi;
pub mod stochastic;

/// A derived numeric column aligned to the rows of its input series.
pub type Column = Vec<Option<f64>>;

/// Place a compact indicator series (first value at row `offset`) onto a
/// column of `len` rows.
pub(crate) fn align(values: Vec<f64>, offset: usize, len: usize) -> Column {
    let mut column = vec![None; len];
    for (i, v) in values.into_iter().enumerate() {
        if let Some(slot) = column.get_mut(offset + i) {
            *slot = Some(v);
        }
    }
    column
}
