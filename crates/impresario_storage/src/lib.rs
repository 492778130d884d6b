//! In-memory store implementation for the Impresario showrunner.
//!
//! [`MemoryStore`] implements all three store traits over HashMaps behind
//! RwLocks. It backs unit tests, scenario tests, and database-less runs;
//! production runs use the PostgreSQL store in `impresario_database`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod memory;

pub use memory::MemoryStore;
