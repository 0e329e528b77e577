//! Ingestion error types.

use pokeria_shared::AppError;
use thiserror::Error;

/// Structural failures while reading the daily table.
///
/// Individual malformed rows never produce an error; they are dropped and
/// counted in [`IngestStats`](super::IngestStats).
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The underlying stream could not be read.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV reader rejected the input.
    #[error("Malformed CSV: {0}")]
    Csv(String),

    /// The input has no header row.
    #[error("Input has no header row")]
    MissingHeader,

    /// The header row does not contain the configured date column.
    #[error("Date column '{0}' not found in header")]
    MissingDateColumn(String),
}

impl From<csv::Error> for IngestionError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Self::Io(io),
            _ => Self::Csv(message),
        }
    }
}

impl From<IngestionError> for AppError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Io(e) => Self::Io(e.to_string()),
            other => Self::Input(other.to_string()),
        }
    }
}
