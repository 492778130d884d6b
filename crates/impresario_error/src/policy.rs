//! Policy (reasoning service) error types.

/// Specific error conditions for decision and worker policy calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PolicyErrorKind {
    /// Policy response contained no extractable JSON value.
    ///
    /// Callers treat this as a decision, not an accident: the decision
    /// engine maps it to "zero drafts" and the worker executor maps it
    /// to a task rejection.
    #[display("Malformed policy output: {}", _0)]
    MalformedOutput(String),
    /// Policy call exceeded its configured ceiling
    #[display("Policy call timed out after {}s", _0)]
    Timeout(u64),
    /// Provider signalled rate limiting (HTTP 429)
    #[display("Rate limited by provider: {}", _0)]
    RateLimited(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    HttpStatus {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Response body did not match the expected completion shape
    #[display("Unexpected completion shape: {}", _0)]
    UnexpectedShape(String),
    /// Generic backend failure
    #[display("Policy backend error: {}", _0)]
    Backend(String),
}

impl PolicyErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            PolicyErrorKind::RateLimited(_) => true,
            PolicyErrorKind::HttpStatus { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    pub fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self {
            PolicyErrorKind::RateLimited(_) => (5000, 3, 40),
            PolicyErrorKind::HttpStatus { status_code, .. } => match *status_code {
                429 => (5000, 3, 40),
                503 => (2000, 5, 60),
                500 | 502 | 504 => (1000, 3, 8),
                _ => (2000, 4, 30),
            },
            _ => (2000, 4, 30),
        }
    }
}

/// Policy error with source location tracking.
///
/// # Examples
///
/// ```
/// use impresario_error::{PolicyError, PolicyErrorKind};
///
/// let err = PolicyError::new(PolicyErrorKind::Timeout(120));
/// assert!(format!("{}", err).contains("120"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Policy Error: {} at line {} in {}", kind, line, file)]
pub struct PolicyError {
    /// The kind of error that occurred
    pub kind: PolicyErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PolicyError {
    /// Create a new PolicyError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PolicyErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
