//! Long-running daemon harness around the showrunner engine.
//!
//! [`StudioServer`] runs [`Showrunner`](impresario_showrunner::Showrunner)
//! cycles on a fixed interval, guards each cycle at the loop boundary, and
//! accumulates [`StudioMetrics`] for operators. [`StudioConfig`] is the
//! TOML surface the `studio-server` binary loads at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod metrics;
mod server;

pub use config::{DriverConfig, StudioConfig};
pub use metrics::{MetricsSnapshot, StudioMetrics};
pub use server::StudioServer;
