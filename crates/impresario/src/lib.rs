//! Impresario - Autonomous Showrunner
//!
//! Impresario runs a fictional production studio on a loop: each cycle it
//! drains carried-over work, asks a completion model which tasks the show
//! needs next, fans those tasks out to a troupe of specialist workers, and
//! routes their outputs into the show store. Privileged effects (deploys,
//! DDL, outbound API calls) go through a separate audited safety gate.
//!
//! # Features
//!
//! - **Cycle Engine**: drain, decide, execute, and route in one pass per tick
//! - **Worker Troupe**: lore, design, script, and drama specialists with
//!   per-worker task-type and destination permissions
//! - **Output Routing**: typed destinations with normalization and
//!   rejection instead of panics
//! - **Safety Gate**: blocklist, DDL allowlist, and domain allowlist
//!   checks with an append-only audit trail
//! - **Persistence**: PostgreSQL show store or in-memory store
//! - **Studio Daemon**: interval loop with metrics and graceful shutdown
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use impresario::{
//!     MemoryStore, PlaybookLibrary, Showrunner, ShowrunnerConfig, StoreObserver,
//!     TroupeRegistry,
//! };
//! use impresario::HttpCompletionClient;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = Arc::new(HttpCompletionClient::new(
//!         "https://api.openai.com",
//!         std::env::var("OPENAI_API_KEY").ok(),
//!         "gpt-4o-mini",
//!         Duration::from_secs(120),
//!     )?);
//!     let store = Arc::new(MemoryStore::new());
//!     let runner = Showrunner::new(
//!         driver,
//!         store.clone(),
//!         store.clone(),
//!         Arc::new(TroupeRegistry::default_troupe()),
//!         PlaybookLibrary::builtin(),
//!         Arc::new(StoreObserver::new(store)),
//!         ShowrunnerConfig::default(),
//!     );
//!
//!     let outcome = runner.run_cycle().await?;
//!     println!("decided {} tasks", outcome.decided);
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `openai` - OpenAI-compatible HTTP completion driver
//! - `database` - PostgreSQL persistence via diesel
//! - `studio` - Long-running studio daemon and `studio-server` binary
//! - `all` - Enable all features
//!
//! # Architecture
//!
//! Impresario is organized as a workspace with focused crates:
//!
//! - `impresario_error` - Error types with source locations
//! - `impresario_core` - Tasks, workers, destinations, show records
//! - `impresario_interface` - Store, driver, and observer traits
//! - `impresario_storage` - In-memory store for tests and dry runs
//! - `impresario_showrunner` - Decision, execution, and routing engine
//! - `impresario_forge` - Safety gate for privileged effects
//! - `impresario_models` - Completion drivers (HTTP, scripted)
//! - `impresario_database` - PostgreSQL store and migrations
//! - `impresario_studio` - Daemon harness and metrics
//!
//! This crate (`impresario`) re-exports everything for convenience.

// Re-export core crates (always available)
pub use impresario_core::*;
pub use impresario_error::*;
pub use impresario_forge::*;
pub use impresario_interface::*;
pub use impresario_showrunner::*;
pub use impresario_storage::*;

// Re-export optional crates based on features
#[cfg(feature = "openai")]
pub use impresario_models::*;

#[cfg(feature = "database")]
pub use impresario_database::*;

#[cfg(feature = "studio")]
pub use impresario_studio::*;
