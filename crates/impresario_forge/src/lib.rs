//! Safety-gated execution of privileged effects.
//!
//! The forge performs the show's outward-reaching actions: deploying
//! generated code, running DDL against the show database, and calling
//! external APIs. Every action passes the [`SafetyGate`] first, every
//! decision (permit or deny) is audited, and denials never reach the
//! backend. The gate is a stateless policy check, reusable outside the
//! forge executor.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod backend;
mod executor;
mod gate;
mod policy;

pub use action::ForgeAction;
pub use backend::{ForgeBackend, ForgeOutcome, NoopForgeBackend};
pub use executor::ForgeExecutor;
pub use gate::{GateDecision, SafetyGate};
pub use policy::{BlockRule, ForgePolicy};
