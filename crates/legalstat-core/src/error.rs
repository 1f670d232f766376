//! # Error Types
//!
//! Two error families are shared across the workspace:
//!
//! - [`ValidationError`]: bad or missing caller input. Raised before any
//!   port is touched, so a validation failure never has side effects.
//! - [`PortError`]: the single failure type every port returns. The engine
//!   wraps it with the name of the operation that failed.

use thiserror::Error;

/// Caller input rejected before any side effect takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Patent identifier was empty or whitespace-only.
    #[error("patent ID must not be empty")]
    EmptyPatentId,

    /// Portfolio identifier was empty or whitespace-only.
    #[error("portfolio ID must not be empty")]
    EmptyPortfolioId,

    /// Jurisdiction code was empty or whitespace-only.
    #[error("jurisdiction code must not be empty")]
    EmptyJurisdiction,

    /// A batch request carried no patent IDs.
    #[error("batch must contain at least one patent ID")]
    EmptyBatch,

    /// A batch request exceeded the configured maximum size.
    #[error("batch of {size} patent IDs exceeds the maximum of {max}")]
    BatchTooLarge {
        /// Number of IDs submitted.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A batch entry was an empty string.
    #[error("patent ID at position {index} is empty")]
    EmptyBatchEntry {
        /// Zero-based position of the offending entry.
        index: usize,
    },

    /// The same patent ID appeared twice in one batch.
    #[error("duplicate patent ID in batch: {0}")]
    DuplicatePatentId(String),

    /// Subscription named neither patents nor a portfolio.
    #[error("subscription must target at least one patent ID or a portfolio ID")]
    MissingSubscriptionTarget,

    /// Subscription named no delivery channel.
    #[error("subscription must name at least one notification channel")]
    MissingChannel,

    /// Subscription recipient was empty.
    #[error("subscription recipient must not be empty")]
    MissingRecipient,

    /// Subscription identifier was not a UUID.
    #[error("invalid subscription ID {0:?}")]
    InvalidSubscriptionId(String),

    /// History pagination parameters out of range.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// History date range with `from` after `to`.
    #[error("invalid date range: from {from} is after to {to}")]
    InvalidDateRange {
        /// Lower bound as supplied.
        from: String,
        /// Upper bound as supplied.
        to: String,
    },

    /// A unified status code string did not name any known code.
    #[error("unknown unified status code: {0:?}")]
    UnknownStatusCode(String),

    /// Timestamp string could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Failure reported by a port implementation.
///
/// Deliberately coarse: the engine only needs to distinguish "the thing is
/// not there" from "the backend could not answer". Everything else is
/// carried as a diagnostic string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The requested record or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend is unreachable, timed out, or returned a server error.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend understood the request and refused it.
    #[error("rejected by backend: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for PortError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
