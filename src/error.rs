use thiserror::Error;

/// Failures a solve can end in. Strategy internals are converted into these at
/// the dispatcher boundary; no other error type escapes the crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// The input board violates the shape or endpoint-parity contract.
    #[error("invalid board: {reason}")]
    InvalidBoard { reason: String },

    /// The strategy exhausted its search without finding a covering.
    /// Definitive for the path-enumeration and heuristic strategies.
    #[error("no solution exists")]
    NoSolution,

    /// The deadline expired before the search concluded.
    #[error("deadline exceeded")]
    Timeout,

    /// The constraint back-end failed to run.
    #[error("solver back-end unavailable: {0}")]
    BackendUnavailable(String),

    /// Catch-all for internal defects; never carries strategy internals.
    #[error("internal solver error: {0}")]
    Internal(String),
}

impl SolveError {
    #[inline]
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SolveError::InvalidBoard {
            reason: reason.into(),
        }
    }
}
