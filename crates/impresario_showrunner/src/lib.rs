//! Decision, execution, and routing engine for the Impresario showrunner.
//!
//! One cycle of the engine: assemble a [`Blackboard`] from live storage,
//! drain any carried-over tasks, ask the [`DecisionEngine`] for new task
//! drafts, persist them as a batch, then execute each task sequentially.
//! Each execution feeds capability-scoped context in, expects JSON out, and
//! routes the result into domain tables through the [`OutputRouter`]. The
//! [`Showrunner`] owns the cycle; the studio server schedules it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod blackboard;
mod context;
mod cycle;
mod decision;
mod executor;
mod extraction;
mod playbook;
mod router;
mod troupe;

pub use blackboard::Blackboard;
pub use context::ContextBuilder;
pub use cycle::{CycleOutcome, Showrunner, ShowrunnerConfig, ShowrunnerConfigBuilder};
pub use decision::DecisionEngine;
pub use executor::WorkerExecutor;
pub use extraction::{extract_json, extract_json_value, parse_json};
pub use playbook::{Playbook, PlaybookLibrary};
pub use router::{OutputRouter, TypeNormalizer};
pub use troupe::TroupeRegistry;
