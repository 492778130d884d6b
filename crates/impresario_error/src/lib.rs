//! Error types for the Impresario workspace.
//!
//! This crate provides the foundation error types used throughout the
//! Impresario showrunner ecosystem.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use impresario_error::{ImpresarioResult, HttpError};
//!
//! fn fetch_data() -> ImpresarioResult<String> {
//!     Err(HttpError::new("Connection refused"))?
//! }
//!
//! match fetch_data() {
//!     Ok(data) => println!("Got: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod forge;
mod http;
mod json;
mod policy;
mod registry;
mod storage;

pub use config::ConfigError;
pub use error::{ImpresarioError, ImpresarioErrorKind, ImpresarioResult};
pub use forge::{ForgeError, ForgeErrorKind};
pub use http::HttpError;
pub use json::JsonError;
pub use policy::{PolicyError, PolicyErrorKind};
pub use registry::{RegistryError, RegistryErrorKind};
pub use storage::{StorageError, StorageErrorKind};
