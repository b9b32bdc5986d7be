//! Closed error-code enumeration.
//!
//! Codes are stable string identifiers: they cross the wire as JSON, key the
//! recovery registry, and are compared by value. Subcode families carry a
//! domain prefix and are treated as opaque enumerated values, never parsed.

use serde::{Deserialize, Serialize};

/// Classification of an operation failure.
///
/// Base categories cover the generic failure surface; the `engine` and
/// `ledger` families classify failures reported by the remote execution
/// engine and the settlement executor. Both families are assimilated to
/// [`ErrorCode::Internal`] via [`ErrorCode::base_code`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Conflict with current state.
    Conflict,
    /// Internal error.
    Internal,
    /// Invalid input.
    Invalid,
    /// Resource not found.
    NotFound,
    /// Feature not implemented.
    NotImplemented,
    /// Access denied.
    Unauthorized,
    /// Unknown error.
    Unknown,
    /// Access forbidden.
    Forbidden,
    /// Resource already exists.
    Exists,
    /// Retry budget spent (synthesized by the queue, never by a collaborator).
    MaxAttempts,
    /// No authenticated session.
    NotAuthenticated,

    /// Execution engine family prefix.
    Engine,
    /// Engine subcode: compute quota exhausted.
    QuotaExhausted,
    /// Engine subcode: worker pool not found.
    PoolNotFound,
    /// Engine subcode: worker pool claim timed out.
    PoolTimeout,

    /// Settlement executor family prefix.
    Ledger,
}

impl ErrorCode {
    /// Stable string identifier (the wire and log representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Conflict => "conflict",
            ErrorCode::Internal => "internal",
            ErrorCode::Invalid => "invalid",
            ErrorCode::NotFound => "not_found",
            ErrorCode::NotImplemented => "not_implemented",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Unknown => "unknown",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::Exists => "exists",
            ErrorCode::MaxAttempts => "max_attempts",
            ErrorCode::NotAuthenticated => "not_authenticated",
            ErrorCode::Engine => "engine",
            ErrorCode::QuotaExhausted => "quota_exhausted",
            ErrorCode::PoolNotFound => "pool_not_found",
            ErrorCode::PoolTimeout => "pool_timeout",
            ErrorCode::Ledger => "ledger",
        }
    }

    /// Fold subcode families onto their base category.
    ///
    /// Engine-family codes and `ledger` report internal failures of their
    /// respective executors; callers routing on the base taxonomy treat them
    /// as `internal`. Base categories map to themselves.
    pub fn base_code(&self) -> ErrorCode {
        match self {
            ErrorCode::Engine
            | ErrorCode::QuotaExhausted
            | ErrorCode::PoolNotFound
            | ErrorCode::PoolTimeout
            | ErrorCode::Ledger => ErrorCode::Internal,
            other => *other,
        }
    }

    /// True for codes belonging to a domain-prefixed subcode family.
    pub fn is_subcode(&self) -> bool {
        self.base_code() != *self
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
