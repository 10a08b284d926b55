// =============================================================================
// Weekly Resampling
// =============================================================================
//
// Aggregates daily bars into ISO calendar weeks (Monday..Sunday):
//   open     = first session's open
//   high     = max high,  low = min low
//   close    = last session's close (same for adjusted_close)
//   volume   = sum,  trade_count = sum (missing if no session carried it)
//   date     = date of the week's last session
//
// Partial weeks at the start and end of the series are kept as they are.

use chrono::Datelike;

use super::series::{PriceBar, PriceSeries};
use crate::error::Result;

/// Resample a daily series into weekly bars.
pub fn resample_weekly(daily: &PriceSeries) -> Result<PriceSeries> {
    let mut weeks: Vec<PriceBar> = Vec::new();
    let mut current_week = None;

    for bar in daily.bars() {
        let week = bar.date.iso_week();
        let key = (week.year(), week.week());

        if current_week == Some(key) {
            if let Some(agg) = weeks.last_mut() {
                agg.date = bar.date;
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.adjusted_close = bar.adjusted_close;
                agg.volume = agg.volume.saturating_add(bar.volume);
                agg.trade_count = match (agg.trade_count, bar.trade_count) {
                    (Some(a), Some(b)) => Some(a.saturating_add(b)),
                    (a, b) => a.or(b),
                };
            }
        } else {
            current_week = Some(key);
            weeks.push(bar.clone());
        }
    }

    PriceSeries::new(daily.symbol(), weeks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> PriceBar {
        PriceBar {
            date,
            open,
            high,
            low,
            close,
            adjusted_close: close,
            volume,
            trade_count: None,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn aggregates_within_iso_week() {
        // 2024-01-03 is a Wednesday; 2024-01-08 starts the next ISO week.
        let bars = vec![
            bar(d(2024, 1, 3), 10.0, 11.0, 9.5, 10.5, 100),
            bar(d(2024, 1, 4), 10.5, 12.0, 10.0, 11.5, 200),
            bar(d(2024, 1, 5), 11.5, 11.8, 9.0, 9.2, 300),
            bar(d(2024, 1, 8), 9.2, 9.9, 9.1, 9.8, 50),
        ];
        let daily = PriceSeries::new("WEGE3", bars).unwrap();
        let weekly = resample_weekly(&daily).unwrap();

        assert_eq!(weekly.len(), 2);
        let first = &weekly.bars()[0];
        assert_eq!(first.date, d(2024, 1, 5));
        assert_eq!(first.open, 10.0);
        assert_eq!(first.high, 12.0);
        assert_eq!(first.low, 9.0);
        assert_eq!(first.close, 9.2);
        assert_eq!(first.volume, 600);
        assert_eq!(first.trade_count, None);

        let second = &weekly.bars()[1];
        assert_eq!(second.date, d(2024, 1, 8));
        assert_eq!(second.volume, 50);
    }

    #[test]
    fn year_boundary_uses_iso_week() {
        // 2024-12-30 (Mon) and 2025-01-02 (Thu) share ISO week 2025-W01.
        let bars = vec![
            bar(d(2024, 12, 27), 5.0, 5.0, 5.0, 5.0, 1),
            bar(d(2024, 12, 30), 5.0, 6.0, 5.0, 6.0, 1),
            bar(d(2025, 1, 2), 6.0, 7.0, 6.0, 7.0, 1),
        ];
        let daily = PriceSeries::new("ABEV3", bars).unwrap();
        let weekly = resample_weekly(&daily).unwrap();
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly.bars()[1].open, 5.0);
        assert_eq!(weekly.bars()[1].close, 7.0);
    }

    #[test]
    fn trade_count_sums_available_values() {
        let mut a = bar(d(2024, 1, 1), 1.0, 1.0, 1.0, 1.0, 1);
        let mut b = bar(d(2024, 1, 2), 1.0, 1.0, 1.0, 1.0, 1);
        a.trade_count = Some(10);
        b.trade_count = Some(5);
        let daily = PriceSeries::new("X", vec![a, b]).unwrap();
        assert_eq!(resample_weekly(&daily).unwrap().bars()[0].trade_count, Some(15));
    }
}
