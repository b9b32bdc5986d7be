//! Classified error value and the operation result alias.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::code::ErrorCode;

/// Result of an asynchronous operation handed to the dispatch core.
///
/// The standard `Result` surface carries the required transforms: `map`,
/// `map_err`, `unwrap_or`, `unwrap_or_else`. `unwrap`/`unwrap_err` against
/// the wrong variant panic — that is a programmer-error signal, never
/// control flow.
pub type OpResult<T> = Result<T, Error>;

/// A classified operation failure.
///
/// Immutable once constructed. The dispatch core reads only `code`; the
/// message and detail lines pass through opaquely to whoever observes the
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{code}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach ordered detail lines (e.g. field-level validation output).
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Invalid, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, msg)
    }

    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotAuthenticated, msg)
    }

    pub fn max_attempts(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MaxAttempts, msg)
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, msg)
    }
}
