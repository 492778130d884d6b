//! Forge (privileged effect) error types.

/// Specific error conditions for gated effect execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ForgeErrorKind {
    /// The safety gate denied the action before execution
    #[display("Action blocked ({}): {}", category, reason)]
    Blocked {
        /// Action category (deploy, ddl, api_call)
        category: String,
        /// Human-readable denial reason
        reason: String,
    },
    /// The backing effect target reported a failure
    #[display("Forge backend failed: {}", _0)]
    BackendFailed(String),
    /// Action payload could not be interpreted
    #[display("Invalid forge action: {}", _0)]
    InvalidAction(String),
}

/// Forge error with location tracking.
///
/// # Examples
///
/// ```
/// use impresario_error::{ForgeError, ForgeErrorKind};
///
/// let err = ForgeError::new(ForgeErrorKind::Blocked {
///     category: "ddl".to_string(),
///     reason: "protected table".to_string(),
/// });
/// assert!(format!("{}", err).contains("protected table"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Forge Error: {} at line {} in {}", kind, line, file)]
pub struct ForgeError {
    /// The kind of error that occurred
    pub kind: ForgeErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ForgeError {
    /// Create a new ForgeError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ForgeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
