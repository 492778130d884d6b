//! Trait definitions for the Impresario showrunner.
//!
//! This crate defines the seams between the engine and everything it talks
//! to: the completion driver that backs the decision engine and the workers,
//! the store traits that persistence layers implement, and the cycle
//! observer that carries telemetry out of the control flow.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod observer;
mod store;
mod traits;
mod types;

pub use observer::{CycleObserver, LogObserver, StoreObserver};
pub use store::{ShowStore, TaskStore, TelemetryStore};
pub use traits::CompletionDriver;
pub use types::{CompletionRequest, CompletionResponse, ShowCounts};
