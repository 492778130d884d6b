//! Persistence traits for tasks, show content, and telemetry.
//!
//! Two implementations exist: an in-memory store for tests and
//! database-less runs, and a PostgreSQL store for production. The engine
//! only ever sees these traits.

use crate::ShowCounts;
use async_trait::async_trait;
use impresario_core::{
    AuditEntry, Blueprint, CanonFact, CanonRule, Conflict, Entity, Episode, Heartbeat,
    NewBlueprint, NewCanonFact, NewConflict, NewEntity, NewScript, NewTeaser, OutputRef, Script,
    Task, Teaser,
};
use impresario_error::ImpresarioResult;

/// Persistence for the task queue and its history.
///
/// Tasks are persisted before execution and never deleted. Status moves
/// forward only; implementations reject backward transitions.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a batch of tasks atomically.
    ///
    /// Either every task in the batch is persisted or none are. A failure
    /// here means the tasks do not exist, and the caller must not execute
    /// them.
    async fn create_batch(&self, tasks: Vec<Task>) -> ImpresarioResult<Vec<Task>>;

    /// Tasks still awaiting execution (assigned or in progress), in
    /// creation order.
    async fn list_pending(&self) -> ImpresarioResult<Vec<Task>>;

    /// Fetch one task by id.
    async fn get_task(&self, id: &str) -> ImpresarioResult<Option<Task>>;

    /// Mark a task in progress and return the updated row.
    ///
    /// Marking an in-progress task in progress again is allowed so a
    /// restarted run can reclaim work.
    async fn mark_in_progress(&self, id: &str) -> ImpresarioResult<Task>;

    /// Complete a task with the destination its output was routed to.
    async fn mark_completed(&self, id: &str, output: OutputRef) -> ImpresarioResult<Task>;

    /// Reject a task, recording the failure text verbatim.
    async fn mark_rejected(&self, id: &str, reason: &str) -> ImpresarioResult<Task>;
}

/// Persistence for the show's content tables.
#[async_trait]
pub trait ShowStore: Send + Sync {
    /// Insert an entity.
    async fn create_entity(&self, new: NewEntity) -> ImpresarioResult<Entity>;

    /// Replace an entity's description and return the updated row.
    async fn update_entity_description(
        &self,
        id: i64,
        description: &str,
    ) -> ImpresarioResult<Entity>;

    /// Fetch one entity by id.
    async fn get_entity(&self, id: i64) -> ImpresarioResult<Option<Entity>>;

    /// Case-insensitive substring match on entity name; first match in
    /// id order, or `None`.
    async fn find_entity_fuzzy(&self, name_fragment: &str) -> ImpresarioResult<Option<Entity>>;

    /// All entities in id order.
    async fn list_entities(&self) -> ImpresarioResult<Vec<Entity>>;

    /// Insert a canon fact.
    async fn create_fact(&self, new: NewCanonFact) -> ImpresarioResult<CanonFact>;

    /// Most recent facts, newest first.
    async fn list_facts(&self, limit: i64) -> ImpresarioResult<Vec<CanonFact>>;

    /// All standing rules.
    async fn list_rules(&self) -> ImpresarioResult<Vec<CanonRule>>;

    /// Insert a conflict; opens at the given intensity.
    async fn create_conflict(&self, new: NewConflict) -> ImpresarioResult<Conflict>;

    /// Fetch one conflict by id.
    async fn get_conflict(&self, id: i64) -> ImpresarioResult<Option<Conflict>>;

    /// Case-insensitive substring match on conflict title; first match in
    /// id order, or `None`.
    async fn find_conflict_fuzzy(&self, title_fragment: &str)
    -> ImpresarioResult<Option<Conflict>>;

    /// Raise a conflict's intensity and mark it escalated.
    ///
    /// Uses the explicit intensity when given, otherwise bumps by one;
    /// either way the result is clamped to 10.
    async fn escalate_conflict(&self, id: i64, intensity: Option<i32>)
    -> ImpresarioResult<Conflict>;

    /// Close a conflict with its resolution text.
    async fn resolve_conflict(&self, id: i64, resolution: &str) -> ImpresarioResult<Conflict>;

    /// Conflicts still driving drama (open or escalated), in id order.
    async fn list_open_conflicts(&self) -> ImpresarioResult<Vec<Conflict>>;

    /// Insert a blueprint.
    async fn create_blueprint(&self, new: NewBlueprint) -> ImpresarioResult<Blueprint>;

    /// All blueprints in id order.
    async fn list_blueprints(&self) -> ImpresarioResult<Vec<Blueprint>>;

    /// Insert a teaser.
    async fn create_teaser(&self, new: NewTeaser) -> ImpresarioResult<Teaser>;

    /// Most recent teasers, newest first.
    async fn list_recent_teasers(&self, limit: i64) -> ImpresarioResult<Vec<Teaser>>;

    /// Insert a script.
    async fn create_script(&self, new: NewScript) -> ImpresarioResult<Script>;

    /// All scripts, in id order.
    async fn list_scripts(&self) -> ImpresarioResult<Vec<Script>>;

    /// The most recently published episode, if any.
    async fn latest_episode(&self) -> ImpresarioResult<Option<Episode>>;

    /// Row counts per table, for the blackboard summary.
    async fn table_counts(&self) -> ImpresarioResult<ShowCounts>;
}

/// Persistence for the observability side channel.
///
/// Execution never reads these back; operators do.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Insert or update the heartbeat row keyed by worker id.
    async fn upsert_heartbeat(&self, heartbeat: Heartbeat) -> ImpresarioResult<()>;

    /// Latest heartbeat per worker.
    async fn list_heartbeats(&self) -> ImpresarioResult<Vec<Heartbeat>>;

    /// Append one gate decision to the audit trail.
    async fn append_audit(&self, entry: AuditEntry) -> ImpresarioResult<()>;

    /// Most recent audit entries, newest first.
    async fn list_audit(&self, limit: i64) -> ImpresarioResult<Vec<AuditEntry>>;
}
