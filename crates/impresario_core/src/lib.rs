//! Core data types for the Impresario showrunner.
//!
//! This crate provides the foundation data types used across all Impresario
//! crates: tasks and their lifecycle, the worker troupe, domain records
//! (entities, canon, conflicts, blueprints, teasers, scripts, episodes),
//! output destinations, worker heartbeats, and safety audit entries.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod destination;
mod heartbeat;
mod record;
mod task;
mod worker;

pub use audit::AuditEntry;
pub use destination::Destination;
pub use heartbeat::{Heartbeat, WorkerStatus};
pub use record::{
    Blueprint, CanonFact, CanonRule, Conflict, ConflictStatus, Entity, Episode, NewBlueprint,
    NewCanonFact, NewConflict, NewEntity, NewScript, NewTeaser, Script, Teaser,
};
pub use task::{OutputRef, Task, TaskDraft, TaskStatus};
pub use worker::{Worker, WorkerBuilder, WorkerRole};
