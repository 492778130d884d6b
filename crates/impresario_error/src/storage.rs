//! Storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Record not found in the named table
    #[display("Not found in {}: {}", table, id)]
    NotFound {
        /// Table the lookup targeted
        table: String,
        /// Identifier that missed
        id: String,
    },
    /// Attempted a backward task status transition
    #[display("Invalid status transition for task {}: {} -> {}", task_id, from, to)]
    InvalidTransition {
        /// Task whose status was mutated
        task_id: String,
        /// Status before the attempt
        from: String,
        /// Status the caller requested
        to: String,
    },
    /// Underlying backend rejected the operation
    #[display("Storage backend error: {}", _0)]
    Backend(String),
    /// Failed to establish a database connection
    #[display("Connection failed: {}", _0)]
    Connection(String),
    /// Row could not be converted to a domain value
    #[display("Row conversion failed: {}", _0)]
    Conversion(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use impresario_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::Backend("disk full".to_string()));
/// assert!(format!("{}", err).contains("disk full"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
