//! Troupe registry error types.

/// Specific error conditions for capability lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RegistryErrorKind {
    /// Task names a worker absent from the troupe registry
    #[display("Unknown worker: {}", _0)]
    UnknownWorker(String),
    /// No playbook registered for the worker's role
    #[display("No playbook for role: {}", _0)]
    MissingPlaybook(String),
    /// Registry constructed with no workers at all
    #[display("Troupe registry is empty")]
    EmptyTroupe,
}

/// Registry error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Registry Error: {} at line {} in {}", kind, line, file)]
pub struct RegistryError {
    /// The kind of error that occurred
    pub kind: RegistryErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RegistryError {
    /// Create a new RegistryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RegistryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
