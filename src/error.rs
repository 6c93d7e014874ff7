//! Error types for the engine boundary and the CSV layer.

use thiserror::Error;

/// Rejection reasons for orders that reach [`crate::MatchingEngine::submit`]
/// unvalidated. A rejected order produces no execution report and leaves the
/// book untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum OrderRejected {
    #[error("order quantity must be positive")]
    NonPositiveQuantity,
    #[error("limit order must have a price")]
    LimitWithoutPrice,
}

/// Per-line failures while ingesting the order CSV. Bad lines are skipped and
/// reported; the run continues.
#[derive(Debug, Error)]
pub enum OrderParseError {
    #[error("order quantity must be positive")]
    NonPositiveQuantity,
    #[error("limit order is missing a price")]
    MissingPrice,
    #[error("malformed record: {0}")]
    Malformed(#[from] csv::Error),
}

/// File-level failures at the CSV boundary.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
