// =============================================================================
// Macro Correlation
// =============================================================================
//
// Pearson correlation of one-bar simple returns between an instrument and a
// reference instrument, over the sessions both traded. Returns are taken
// between consecutive common sessions so calendar gaps never pair unrelated
// days.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::market_data::PriceBar;

/// Pearson correlation of two equal-length samples.
///
/// `None` for fewer than two pairs or when either sample has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    let r = (cov / denom).clamp(-1.0, 1.0);
    r.is_finite().then_some(r)
}

/// Correlation of the last `window` date-aligned returns up to `as_of`.
///
/// `None` when fewer than `window` aligned return pairs exist.
pub fn return_correlation(
    bars: &[PriceBar],
    reference: &[PriceBar],
    as_of: NaiveDate,
    window: usize,
) -> Option<f64> {
    let reference_close: BTreeMap<NaiveDate, f64> = reference
        .iter()
        .filter(|b| b.date <= as_of)
        .map(|b| (b.date, b.close))
        .collect();

    let aligned: Vec<(f64, f64)> = bars
        .iter()
        .filter(|b| b.date <= as_of)
        .filter_map(|b| reference_close.get(&b.date).map(|&r| (b.close, r)))
        .collect();

    let (mut ra, mut rb) = (Vec::new(), Vec::new());
    for pair in aligned.windows(2) {
        let ((a0, b0), (a1, b1)) = (pair[0], pair[1]);
        if a0 == 0.0 || b0 == 0.0 {
            continue;
        }
        ra.push(a1 / a0 - 1.0);
        rb.push(b1 / b0 - 1.0);
    }

    if window < 2 || ra.len() < window {
        return None;
    }
    pearson(&ra[ra.len() - window..], &rb[rb.len() - window..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::series::tests::{bar, day};

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(day(i as i64), c))
            .collect()
    }

    fn wave(n: usize, scale: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 50.0 + scale * ((i as f64) * 0.7).sin())
            .collect()
    }

    #[test]
    fn pearson_extremes() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn identical_series_correlate_perfectly() {
        let a = bars(&wave(80, 3.0));
        let r = return_correlation(&a, &a, day(79), 60).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_common_sessions() {
        let a = bars(&wave(80, 3.0));
        let b = bars(&wave(30, 3.0));
        assert_eq!(return_correlation(&a, &b, day(79), 60), None);
    }

    #[test]
    fn ignores_sessions_after_as_of() {
        let a = bars(&wave(120, 3.0));
        let b = bars(&wave(120, 3.0));
        assert!(return_correlation(&a, &b, day(60), 60).is_some());
        assert_eq!(return_correlation(&a, &b, day(59), 60), None);
    }
}
