//! # Engine Errors
//!
//! Three failure classes, matching how callers must react:
//!
//! - **Validation**: bad input, returned before any side effect.
//! - **NotFound**: no local record where one is required.
//! - **Internal**: a critical-path port failed; carries the operation name.
//!
//! plus **Cancelled** when the caller's token fired. Failures of best-effort
//! side effects (publish, cache writes, bookkeeping) never become an
//! `EngineError`; they are logged and counted instead.

use legalstat_core::{PortError, ValidationError};
use thiserror::Error;

/// Error returned by engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Caller input rejected.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Required local record missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A port on the critical path failed.
    #[error("{operation} failed: {source}")]
    Internal {
        /// Engine step that issued the port call.
        operation: &'static str,
        /// Underlying port failure.
        source: PortError,
    },

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Wrap a port failure with the failing operation's name.
    pub fn internal(operation: &'static str, source: PortError) -> Self {
        Self::Internal { operation, source }
    }

    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes() {
        assert_eq!(
            EngineError::from(ValidationError::EmptyBatch).kind(),
            "VALIDATION_ERROR"
        );
        assert_eq!(EngineError::NotFound("US1".into()).kind(), "NOT_FOUND");
        assert_eq!(
            EngineError::internal("fetch_remote_status", PortError::Unavailable("down".into()))
                .kind(),
            "INTERNAL_ERROR"
        );
        assert_eq!(EngineError::Cancelled.kind(), "CANCELLED");
    }

    #[test]
    fn internal_message_names_operation_and_cause() {
        let err = EngineError::internal("persist_status", PortError::Unavailable("db down".into()));
        let msg = err.to_string();
        assert!(msg.contains("persist_status"));
        assert!(msg.contains("db down"));
    }
}
