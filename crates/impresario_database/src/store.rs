//! PostgreSQL implementation of the store traits.

use crate::rows::{
    AuditRow, BlueprintRow, CanonFactRow, CanonRuleRow, ConflictRow, EntityRow, EpisodeRow,
    HeartbeatRow, NewAuditRow, NewBlueprintRow, NewCanonFactRow, NewConflictRow, NewEntityRow,
    NewScriptRow, NewTaskRow, NewTeaserRow, ScriptRow, TaskRow, TeaserRow, conversion_failed,
};
use crate::schema::{
    audit_log, blueprints, canon_facts, canon_rules, conflicts, entities, episodes, heartbeats,
    scripts, tasks, teasers,
};
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use impresario_core::{
    AuditEntry, Blueprint, CanonFact, CanonRule, Conflict, Entity, Episode, Heartbeat,
    NewBlueprint, NewCanonFact, NewConflict, NewEntity, NewScript, NewTeaser, OutputRef, Script,
    Task, TaskStatus, Teaser,
};
use impresario_error::{ImpresarioError, ImpresarioResult, StorageError, StorageErrorKind};
use impresario_interface::{ShowCounts, ShowStore, TaskStore, TelemetryStore};
use std::sync::Arc;
use tokio::sync::Mutex;

fn backend_failed(context: &str, e: impl std::fmt::Display) -> ImpresarioError {
    StorageError::new(StorageErrorKind::Backend(format!("{context}: {e}"))).into()
}

fn not_found(table: &str, id: impl std::fmt::Display) -> ImpresarioError {
    StorageError::new(StorageErrorKind::NotFound {
        table: table.to_string(),
        id: id.to_string(),
    })
    .into()
}

/// Escape LIKE metacharacters in a user-supplied fragment and wrap it in
/// wildcards for a substring match.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// PostgreSQL store for tasks, show content, and telemetry.
///
/// The connection is wrapped in `Arc<Mutex>` for async access, which also
/// serializes writes. The cycle controller runs tasks sequentially, so a
/// single connection is not a bottleneck; a pool would only matter with
/// multiple concurrent showrunners.
///
/// # Example
/// ```no_run
/// use impresario_database::{PgStore, establish_connection};
/// use impresario_interface::TaskStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = PgStore::new(establish_connection()?);
///     store.run_migrations().await?;
///     let pending = store.list_pending().await?;
///     println!("{} pending tasks", pending.len());
///     Ok(())
/// }
/// ```
pub struct PgStore {
    conn: Arc<Mutex<PgConnection>>,
}

impl PgStore {
    /// Wrap an established connection.
    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Share an existing connection handle.
    pub fn from_arc(conn: Arc<Mutex<PgConnection>>) -> Self {
        Self { conn }
    }

    /// Connect using the `DATABASE_URL` environment variable.
    pub fn connect() -> ImpresarioResult<Self> {
        Ok(Self::new(crate::connection::establish_connection()?))
    }

    /// Apply any pending schema migrations.
    pub async fn run_migrations(&self) -> ImpresarioResult<()> {
        let mut conn = self.conn.lock().await;
        crate::connection::run_migrations(&mut conn)
    }

    /// Load a task row and apply a forward-only status transition.
    async fn transition(
        &self,
        id: &str,
        next: TaskStatus,
        output: Option<OutputRef>,
        rejection_reason: Option<String>,
    ) -> ImpresarioResult<Task> {
        let mut conn = self.conn.lock().await;
        let row: Option<TaskRow> = tasks::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to load task", e))?;
        let row = row.ok_or_else(|| not_found("tasks", id))?;
        let current: TaskStatus = row.status.parse().map_err(conversion_failed)?;
        if !current.can_transition_to(next) {
            return Err(StorageError::new(StorageErrorKind::InvalidTransition {
                task_id: id.to_string(),
                from: current.as_str().to_string(),
                to: next.as_str().to_string(),
            })
            .into());
        }

        let (destination, record_id) = match &output {
            Some(output) => (
                Some(output.destination.as_str().to_string()),
                output.record_id,
            ),
            None => (None, None),
        };
        let updated: TaskRow = diesel::update(tasks::table.find(id))
            .set((
                tasks::status.eq(next.as_str()),
                tasks::output_destination.eq(destination),
                tasks::output_record_id.eq(record_id),
                tasks::rejection_reason.eq(rejection_reason),
                tasks::updated_at.eq(Utc::now()),
            ))
            .get_result(&mut *conn)
            .map_err(|e| backend_failed("Failed to update task status", e))?;
        Task::try_from(updated)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_batch(&self, new_tasks: Vec<Task>) -> ImpresarioResult<Vec<Task>> {
        if new_tasks.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<NewTaskRow> = new_tasks.iter().map(NewTaskRow::from).collect();
        let mut conn = self.conn.lock().await;
        // One multi-row insert, so a partial batch is never visible.
        let inserted: Vec<TaskRow> = diesel::insert_into(tasks::table)
            .values(&rows)
            .get_results(&mut *conn)
            .map_err(|e| backend_failed("Failed to create task batch", e))?;
        inserted.into_iter().map(Task::try_from).collect()
    }

    async fn list_pending(&self) -> ImpresarioResult<Vec<Task>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<TaskRow> = tasks::table
            .filter(tasks::status.eq_any(["assigned", "in_progress"]))
            .order(tasks::seq.asc())
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list pending tasks", e))?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn get_task(&self, id: &str) -> ImpresarioResult<Option<Task>> {
        let mut conn = self.conn.lock().await;
        let row: Option<TaskRow> = tasks::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to load task", e))?;
        row.map(Task::try_from).transpose()
    }

    async fn mark_in_progress(&self, id: &str) -> ImpresarioResult<Task> {
        self.transition(id, TaskStatus::InProgress, None, None).await
    }

    async fn mark_completed(&self, id: &str, output: OutputRef) -> ImpresarioResult<Task> {
        self.transition(id, TaskStatus::Completed, Some(output), None)
            .await
    }

    async fn mark_rejected(&self, id: &str, reason: &str) -> ImpresarioResult<Task> {
        self.transition(id, TaskStatus::Rejected, None, Some(reason.to_string()))
            .await
    }
}

#[async_trait]
impl ShowStore for PgStore {
    async fn create_entity(&self, new: NewEntity) -> ImpresarioResult<Entity> {
        let mut conn = self.conn.lock().await;
        let row: EntityRow = diesel::insert_into(entities::table)
            .values(NewEntityRow::from(new))
            .get_result(&mut *conn)
            .map_err(|e| backend_failed("Failed to create entity", e))?;
        Ok(row.into())
    }

    async fn update_entity_description(
        &self,
        id: i64,
        description: &str,
    ) -> ImpresarioResult<Entity> {
        let mut conn = self.conn.lock().await;
        let row: Option<EntityRow> = diesel::update(entities::table.find(id))
            .set(entities::description.eq(description))
            .get_result(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to update entity", e))?;
        row.map(Entity::from)
            .ok_or_else(|| not_found("entities", id))
    }

    async fn get_entity(&self, id: i64) -> ImpresarioResult<Option<Entity>> {
        let mut conn = self.conn.lock().await;
        let row: Option<EntityRow> = entities::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to load entity", e))?;
        Ok(row.map(Entity::from))
    }

    async fn find_entity_fuzzy(&self, name_fragment: &str) -> ImpresarioResult<Option<Entity>> {
        let mut conn = self.conn.lock().await;
        let row: Option<EntityRow> = entities::table
            .filter(entities::name.ilike(like_pattern(name_fragment)))
            .order(entities::id.asc())
            .first(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to search entities", e))?;
        Ok(row.map(Entity::from))
    }

    async fn list_entities(&self) -> ImpresarioResult<Vec<Entity>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<EntityRow> = entities::table
            .order(entities::id.asc())
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list entities", e))?;
        Ok(rows.into_iter().map(Entity::from).collect())
    }

    async fn create_fact(&self, new: NewCanonFact) -> ImpresarioResult<CanonFact> {
        let mut conn = self.conn.lock().await;
        let row: CanonFactRow = diesel::insert_into(canon_facts::table)
            .values(NewCanonFactRow::from(new))
            .get_result(&mut *conn)
            .map_err(|e| backend_failed("Failed to create fact", e))?;
        Ok(row.into())
    }

    async fn list_facts(&self, limit: i64) -> ImpresarioResult<Vec<CanonFact>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<CanonFactRow> = canon_facts::table
            .order(canon_facts::id.desc())
            .limit(limit.max(0))
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list facts", e))?;
        Ok(rows.into_iter().map(CanonFact::from).collect())
    }

    async fn list_rules(&self) -> ImpresarioResult<Vec<CanonRule>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<CanonRuleRow> = canon_rules::table
            .order(canon_rules::id.asc())
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list rules", e))?;
        Ok(rows.into_iter().map(CanonRule::from).collect())
    }

    async fn create_conflict(&self, new: NewConflict) -> ImpresarioResult<Conflict> {
        let mut conn = self.conn.lock().await;
        let row: ConflictRow = diesel::insert_into(conflicts::table)
            .values(NewConflictRow::from(new))
            .get_result(&mut *conn)
            .map_err(|e| backend_failed("Failed to create conflict", e))?;
        row.try_into()
    }

    async fn get_conflict(&self, id: i64) -> ImpresarioResult<Option<Conflict>> {
        let mut conn = self.conn.lock().await;
        let row: Option<ConflictRow> = conflicts::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to load conflict", e))?;
        row.map(Conflict::try_from).transpose()
    }

    async fn find_conflict_fuzzy(
        &self,
        title_fragment: &str,
    ) -> ImpresarioResult<Option<Conflict>> {
        let mut conn = self.conn.lock().await;
        let row: Option<ConflictRow> = conflicts::table
            .filter(conflicts::title.ilike(like_pattern(title_fragment)))
            .order(conflicts::id.asc())
            .first(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to search conflicts", e))?;
        row.map(Conflict::try_from).transpose()
    }

    async fn escalate_conflict(
        &self,
        id: i64,
        intensity: Option<i32>,
    ) -> ImpresarioResult<Conflict> {
        let mut conn = self.conn.lock().await;
        let row: Option<ConflictRow> = conflicts::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to load conflict", e))?;
        let row = row.ok_or_else(|| not_found("conflicts", id))?;

        let next_intensity = intensity.unwrap_or(row.intensity + 1).clamp(1, 10);
        let updated: ConflictRow = diesel::update(conflicts::table.find(id))
            .set((
                conflicts::intensity.eq(next_intensity),
                conflicts::status.eq("escalated"),
                conflicts::updated_at.eq(Utc::now()),
            ))
            .get_result(&mut *conn)
            .map_err(|e| backend_failed("Failed to escalate conflict", e))?;
        updated.try_into()
    }

    async fn resolve_conflict(&self, id: i64, resolution: &str) -> ImpresarioResult<Conflict> {
        let mut conn = self.conn.lock().await;
        let row: Option<ConflictRow> = diesel::update(conflicts::table.find(id))
            .set((
                conflicts::status.eq("resolved"),
                conflicts::resolution.eq(resolution),
                conflicts::updated_at.eq(Utc::now()),
            ))
            .get_result(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to resolve conflict", e))?;
        let row = row.ok_or_else(|| not_found("conflicts", id))?;
        row.try_into()
    }

    async fn list_open_conflicts(&self) -> ImpresarioResult<Vec<Conflict>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<ConflictRow> = conflicts::table
            .filter(conflicts::status.ne("resolved"))
            .order(conflicts::id.asc())
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list open conflicts", e))?;
        rows.into_iter().map(Conflict::try_from).collect()
    }

    async fn create_blueprint(&self, new: NewBlueprint) -> ImpresarioResult<Blueprint> {
        let mut conn = self.conn.lock().await;
        let row: BlueprintRow = diesel::insert_into(blueprints::table)
            .values(NewBlueprintRow::from(new))
            .get_result(&mut *conn)
            .map_err(|e| backend_failed("Failed to create blueprint", e))?;
        Ok(row.into())
    }

    async fn list_blueprints(&self) -> ImpresarioResult<Vec<Blueprint>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<BlueprintRow> = blueprints::table
            .order(blueprints::id.asc())
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list blueprints", e))?;
        Ok(rows.into_iter().map(Blueprint::from).collect())
    }

    async fn create_teaser(&self, new: NewTeaser) -> ImpresarioResult<Teaser> {
        let mut conn = self.conn.lock().await;
        let row: TeaserRow = diesel::insert_into(teasers::table)
            .values(NewTeaserRow::from(new))
            .get_result(&mut *conn)
            .map_err(|e| backend_failed("Failed to create teaser", e))?;
        Ok(row.into())
    }

    async fn list_recent_teasers(&self, limit: i64) -> ImpresarioResult<Vec<Teaser>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<TeaserRow> = teasers::table
            .order(teasers::id.desc())
            .limit(limit.max(0))
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list teasers", e))?;
        Ok(rows.into_iter().map(Teaser::from).collect())
    }

    async fn create_script(&self, new: NewScript) -> ImpresarioResult<Script> {
        let mut conn = self.conn.lock().await;
        let row: ScriptRow = diesel::insert_into(scripts::table)
            .values(NewScriptRow::from(new))
            .get_result(&mut *conn)
            .map_err(|e| backend_failed("Failed to create script", e))?;
        Ok(row.into())
    }

    async fn list_scripts(&self) -> ImpresarioResult<Vec<Script>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<ScriptRow> = scripts::table
            .order(scripts::id.asc())
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list scripts", e))?;
        Ok(rows.into_iter().map(Script::from).collect())
    }

    async fn latest_episode(&self) -> ImpresarioResult<Option<Episode>> {
        let mut conn = self.conn.lock().await;
        let row: Option<EpisodeRow> = episodes::table
            .order(episodes::published_at.desc())
            .first(&mut *conn)
            .optional()
            .map_err(|e| backend_failed("Failed to load latest episode", e))?;
        Ok(row.map(Episode::from))
    }

    async fn table_counts(&self) -> ImpresarioResult<ShowCounts> {
        let mut conn = self.conn.lock().await;
        let count = |e| backend_failed("Failed to count rows", e);
        Ok(ShowCounts {
            entities: entities::table
                .count()
                .get_result(&mut *conn)
                .map_err(count)?,
            canon_facts: canon_facts::table
                .count()
                .get_result(&mut *conn)
                .map_err(count)?,
            canon_rules: canon_rules::table
                .count()
                .get_result(&mut *conn)
                .map_err(count)?,
            conflicts: conflicts::table
                .count()
                .get_result(&mut *conn)
                .map_err(count)?,
            blueprints: blueprints::table
                .count()
                .get_result(&mut *conn)
                .map_err(count)?,
            teasers: teasers::table
                .count()
                .get_result(&mut *conn)
                .map_err(count)?,
            scripts: scripts::table
                .count()
                .get_result(&mut *conn)
                .map_err(count)?,
            episodes: episodes::table
                .count()
                .get_result(&mut *conn)
                .map_err(count)?,
        })
    }
}

#[async_trait]
impl TelemetryStore for PgStore {
    async fn upsert_heartbeat(&self, heartbeat: Heartbeat) -> ImpresarioResult<()> {
        let row = HeartbeatRow::from(&heartbeat);
        let mut conn = self.conn.lock().await;
        diesel::insert_into(heartbeats::table)
            .values(&row)
            .on_conflict(heartbeats::worker_id)
            .do_update()
            .set(&row)
            .execute(&mut *conn)
            .map_err(|e| backend_failed("Failed to upsert heartbeat", e))?;
        Ok(())
    }

    async fn list_heartbeats(&self) -> ImpresarioResult<Vec<Heartbeat>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<HeartbeatRow> = heartbeats::table
            .order(heartbeats::worker_id.asc())
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list heartbeats", e))?;
        rows.into_iter().map(Heartbeat::try_from).collect()
    }

    async fn append_audit(&self, entry: AuditEntry) -> ImpresarioResult<()> {
        let row = NewAuditRow::from(&entry);
        let mut conn = self.conn.lock().await;
        diesel::insert_into(audit_log::table)
            .values(&row)
            .execute(&mut *conn)
            .map_err(|e| backend_failed("Failed to append audit entry", e))?;
        Ok(())
    }

    async fn list_audit(&self, limit: i64) -> ImpresarioResult<Vec<AuditEntry>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<AuditRow> = audit_log::table
            .order(audit_log::id.desc())
            .limit(limit.max(0))
            .load(&mut *conn)
            .map_err(|e| backend_failed("Failed to list audit entries", e))?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }
}
