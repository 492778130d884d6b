//! Top-level error wrapper types.

use crate::{
    ConfigError, ForgeError, HttpError, JsonError, PolicyError, RegistryError, StorageError,
};

/// This is the foundation error enum. Each Impresario crate converts its
/// concern-specific error into one of these variants at the boundary.
///
/// # Examples
///
/// ```
/// use impresario_error::{ImpresarioError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: ImpresarioError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ImpresarioErrorKind {
    /// HTTP error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Policy (reasoning service) error
    #[from(PolicyError)]
    Policy(PolicyError),
    /// Troupe registry error
    #[from(RegistryError)]
    Registry(RegistryError),
    /// Forge (privileged effect) error
    #[from(ForgeError)]
    Forge(ForgeError),
}

/// Impresario error with kind discrimination.
///
/// # Examples
///
/// ```
/// use impresario_error::{ImpresarioResult, ConfigError};
///
/// fn might_fail() -> ImpresarioResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Impresario Error: {}", _0)]
pub struct ImpresarioError(Box<ImpresarioErrorKind>);

impl ImpresarioError {
    /// Create a new error from a kind.
    pub fn new(kind: ImpresarioErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ImpresarioErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to ImpresarioErrorKind
impl<T> From<T> for ImpresarioError
where
    T: Into<ImpresarioErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Impresario operations.
///
/// # Examples
///
/// ```
/// use impresario_error::{ImpresarioResult, HttpError};
///
/// fn fetch_data() -> ImpresarioResult<String> {
///     Err(HttpError::new("404 Not Found"))?
/// }
/// ```
pub type ImpresarioResult<T> = std::result::Result<T, ImpresarioError>;
