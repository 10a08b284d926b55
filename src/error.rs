// =============================================================================
// Analysis Errors
// =============================================================================
//
// Every analyzer fails fast with one of these kinds. Recovery (skip the
// instrument, log, re-ingest) is the caller's job.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the indicator engine and the downstream analyzers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The series is shorter than the longest configured indicator window.
    #[error("insufficient history: {required} bars required, {available} available")]
    InsufficientHistory { required: usize, available: usize },

    /// The requested as-of date is not a session of the series.
    #[error("date {date} not found in series")]
    DateNotFound { date: NaiveDate },

    /// A bar violates the OHLC ordering invariant or carries invalid numbers.
    #[error("malformed bar at {date}: {reason}")]
    MalformedBar { date: NaiveDate, reason: String },

    /// Dates are duplicated or not strictly increasing.
    #[error("series not strictly increasing by date at {date}")]
    UnorderedSeries { date: NaiveDate },

    /// The series has no bars at all.
    #[error("series is empty")]
    EmptySeries,

    /// An analyzer asked for an indicator column the enrichment did not produce.
    #[error("indicator column {name} not present in the enriched series")]
    MissingColumn { name: String },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
