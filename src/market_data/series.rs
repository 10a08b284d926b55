use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One traded session of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Close adjusted for corporate actions. Sources without adjustment data
    /// repeat the raw close here.
    pub adjusted_close: f64,
    pub volume: u64,
    /// Number of trades in the session. Not every source supplies this.
    pub trade_count: Option<u64>,
}

impl PriceBar {
    /// Check the OHLC ordering invariant:
    /// `high >= max(open, close) >= min(open, close) >= low >= 0`.
    pub fn validate(&self) -> Result<()> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("adjusted_close", self.adjusted_close),
        ];
        for (name, value) in prices {
            if !value.is_finite() {
                return Err(self.malformed(format!("{name} is not finite")));
            }
            if value < 0.0 {
                return Err(self.malformed(format!("{name} is negative ({value})")));
            }
        }
        if self.high < self.low {
            return Err(self.malformed(format!(
                "high {} below low {}",
                self.high, self.low
            )));
        }
        let body_top = self.open.max(self.close);
        let body_bottom = self.open.min(self.close);
        if self.high < body_top {
            return Err(self.malformed(format!(
                "high {} below body top {body_top}",
                self.high
            )));
        }
        if self.low > body_bottom {
            return Err(self.malformed(format!(
                "low {} above body bottom {body_bottom}",
                self.low
            )));
        }
        Ok(())
    }

    fn malformed(&self, reason: String) -> AnalysisError {
        AnalysisError::MalformedBar {
            date: self.date,
            reason,
        }
    }
}

/// Which close the indicators are computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    #[default]
    Close,
    AdjustedClose,
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Close => write!(f, "close"),
            Self::AdjustedClose => write!(f, "adjusted_close"),
        }
    }
}

// ---------------------------------------------------------------------------
// PriceSeries -- validated, strictly date-ordered bars for one instrument
// ---------------------------------------------------------------------------

/// Ordered bars of a single instrument. Construction validates every bar and
/// the strict date ordering, so every other module can rely on both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Validate `bars` and build the series.
    ///
    /// Fails with `MalformedBar` on the first bar breaking the OHLC invariant
    /// and with `UnorderedSeries` on the first duplicated or decreasing date.
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self> {
        if bars.is_empty() {
            return Err(AnalysisError::EmptySeries);
        }
        for bar in &bars {
            bar.validate()?;
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AnalysisError::UnorderedSeries { date: pair[1].date });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Row index of `date`, if it is a session of this series.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    /// Copy of the series ending at `date` (inclusive).
    ///
    /// Fails with `DateNotFound` when `date` is not a session; there is no
    /// fallback to the nearest prior session.
    pub fn truncated_at(&self, date: NaiveDate) -> Result<Self> {
        let idx = self
            .index_of(date)
            .ok_or(AnalysisError::DateNotFound { date })?;
        Ok(Self {
            symbol: self.symbol.clone(),
            bars: self.bars[..=idx].to_vec(),
        })
    }

    /// Series on the adjusted-close basis: open/high/low are rescaled by
    /// `adjusted_close / close` so the whole bar shares one basis.
    pub fn adjusted(&self) -> Self {
        let bars = self
            .bars
            .iter()
            .map(|b| {
                let factor = if b.close > 0.0 {
                    b.adjusted_close / b.close
                } else {
                    1.0
                };
                PriceBar {
                    open: b.open * factor,
                    high: b.high * factor,
                    low: b.low * factor,
                    close: b.adjusted_close,
                    ..b.clone()
                }
            })
            .collect();
        Self {
            symbol: self.symbol.clone(),
            bars,
        }
    }

    /// Series on the requested price basis.
    pub fn on_basis(&self, field: PriceField) -> Self {
        match field {
            PriceField::Close => self.clone(),
            PriceField::AdjustedClose => self.adjusted(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
