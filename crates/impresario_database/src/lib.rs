//! PostgreSQL persistence for Impresario.
//!
//! This crate implements the store traits from `impresario_interface` on
//! top of Diesel: the task lifecycle table, the show's content tables, and
//! the telemetry tables (heartbeats, audit log). Schema migrations are
//! embedded, so a fresh database only needs a `DATABASE_URL`.
//!
//! # Example
//!
//! ```rust,ignore
//! use impresario_database::{PgStore, establish_connection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PgStore::new(establish_connection()?);
//! store.run_migrations().await?;
//! // Use store...
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod rows;
mod store;

/// Diesel table definitions, public for ad hoc queries.
pub mod schema;

pub use connection::{connect_to, establish_connection, run_migrations};
pub use store::PgStore;
