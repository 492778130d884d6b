//! Completion drivers for the Impresario showrunner.
//!
//! Two [`CompletionDriver`](impresario_interface::CompletionDriver)
//! implementations: an OpenAI-compatible HTTP client for hosted providers,
//! and a scripted driver that replays canned responses for tests and dry
//! runs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod http;
mod scripted;

pub use http::HttpCompletionClient;
pub use scripted::ScriptedDriver;
