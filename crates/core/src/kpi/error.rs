//! KPI error types.

use chrono::NaiveDate;
use pokeria_shared::AppError;
use thiserror::Error;

/// Errors raised while selecting periods.
#[derive(Debug, Error)]
pub enum KpiError {
    /// Invalid date range.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// A derived comparison range falls outside the supported calendar.
    #[error("No comparison period before {0}")]
    DateOutOfRange(NaiveDate),

    /// The dataset has no records to derive a default period from.
    #[error("Dataset is empty")]
    EmptyDataset,
}

impl From<KpiError> for AppError {
    fn from(err: KpiError) -> Self {
        Self::Validation(err.to_string())
    }
}
