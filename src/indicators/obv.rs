// On-Balance Volume: running volume sum, added on up-closes, subtracted on
// down-closes, unchanged when the close repeats. Defined from the first row
// (which starts at zero).

use super::Column;
use crate::market_data::PriceBar;

pub fn obv_column(bars: &[PriceBar]) -> Column {
    let mut total = 0.0_f64;
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if let Some(prev) = i.checked_sub(1).map(|p| &bars[p]) {
                let volume = bar.volume as f64;
                if bar.close > prev.close {
                    total += volume;
                } else if bar.close < prev.close {
                    total -= volume;
                }
            }
            Some(total)
        })
        .collect()
}
