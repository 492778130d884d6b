//! HashMap-backed implementation of the store traits.

use async_trait::async_trait;
use chrono::Utc;
use impresario_core::{
    AuditEntry, Blueprint, CanonFact, CanonRule, Conflict, ConflictStatus, Entity, Episode,
    Heartbeat, NewBlueprint, NewCanonFact, NewConflict, NewEntity, NewScript, NewTeaser,
    OutputRef, Script, Task, TaskStatus, Teaser,
};
use impresario_error::{ImpresarioError, ImpresarioResult, StorageError, StorageErrorKind};
use impresario_interface::{ShowCounts, ShowStore, TaskStore, TelemetryStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Task rows plus their creation order.
#[derive(Debug, Default)]
struct TaskTable {
    rows: HashMap<String, Task>,
    order: Vec<String>,
}

/// Content tables with per-table id sequences, Postgres-style.
#[derive(Debug, Default)]
struct ShowTables {
    entities: HashMap<i64, Entity>,
    entity_seq: i64,
    facts: HashMap<i64, CanonFact>,
    fact_seq: i64,
    rules: HashMap<i64, CanonRule>,
    rule_seq: i64,
    conflicts: HashMap<i64, Conflict>,
    conflict_seq: i64,
    blueprints: HashMap<i64, Blueprint>,
    blueprint_seq: i64,
    teasers: HashMap<i64, Teaser>,
    teaser_seq: i64,
    scripts: HashMap<i64, Script>,
    script_seq: i64,
    episodes: HashMap<i64, Episode>,
    episode_seq: i64,
}

#[derive(Debug, Default)]
struct TelemetryTables {
    heartbeats: HashMap<String, Heartbeat>,
    audit: Vec<AuditEntry>,
}

fn bump(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

fn not_found(table: &str, id: impl std::fmt::Display) -> ImpresarioError {
    ImpresarioError::from(StorageError::new(StorageErrorKind::NotFound {
        table: table.to_string(),
        id: id.to_string(),
    }))
}

/// In-memory store for tasks, show content, and telemetry.
///
/// Data lives in HashMaps behind RwLocks, split into three lock domains so
/// task mutation never contends with content reads. All data is lost when
/// the store is dropped.
///
/// # Example
/// ```no_run
/// use impresario_storage::MemoryStore;
/// use impresario_interface::TaskStore;
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryStore::new();
///     let pending = store.list_pending().await.unwrap();
///     assert!(pending.is_empty());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tasks: Arc<RwLock<TaskTable>>,
    show: Arc<RwLock<ShowTables>>,
    telemetry: Arc<RwLock<TelemetryTables>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks, terminal included (for testing).
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.rows.len()
    }

    /// Whether nothing has been stored yet (for testing).
    pub async fn is_empty(&self) -> bool {
        let tasks = self.tasks.read().await;
        let show = self.show.read().await;
        let telemetry = self.telemetry.read().await;
        tasks.rows.is_empty()
            && show.entities.is_empty()
            && show.facts.is_empty()
            && show.rules.is_empty()
            && show.conflicts.is_empty()
            && show.blueprints.is_empty()
            && show.teasers.is_empty()
            && show.scripts.is_empty()
            && show.episodes.is_empty()
            && telemetry.heartbeats.is_empty()
            && telemetry.audit.is_empty()
    }

    /// Drop all rows and reset id sequences (for testing).
    pub async fn clear(&self) {
        *self.tasks.write().await = TaskTable::default();
        *self.show.write().await = ShowTables::default();
        *self.telemetry.write().await = TelemetryTables::default();
    }

    /// Seed a standing rule. Rules have no insert path through the engine;
    /// operators load them before the first cycle.
    pub async fn seed_rule(&self, rule: impl Into<String>) -> CanonRule {
        let mut show = self.show.write().await;
        let id = bump(&mut show.rule_seq);
        let row = CanonRule {
            id,
            rule: rule.into(),
        };
        show.rules.insert(id, row.clone());
        row
    }

    /// Seed a published episode, standing in for the external assembly
    /// pipeline.
    pub async fn seed_episode(
        &self,
        title: impl Into<String>,
        video_url: Option<String>,
        published_at: chrono::DateTime<Utc>,
    ) -> Episode {
        let mut show = self.show.write().await;
        let id = bump(&mut show.episode_seq);
        let row = Episode {
            id,
            title: title.into(),
            video_url,
            published_at,
        };
        show.episodes.insert(id, row.clone());
        row
    }

    /// Apply a forward status transition under one write lock.
    async fn apply_transition(
        &self,
        id: &str,
        next: TaskStatus,
        update: impl FnOnce(&mut Task),
    ) -> ImpresarioResult<Task> {
        let mut table = self.tasks.write().await;
        let task = table.rows.get_mut(id).ok_or_else(|| not_found("tasks", id))?;
        if !task.status.can_transition_to(next) {
            return Err(ImpresarioError::from(StorageError::new(
                StorageErrorKind::InvalidTransition {
                    task_id: id.to_string(),
                    from: task.status.as_str().to_string(),
                    to: next.as_str().to_string(),
                },
            )));
        }
        task.status = next;
        task.updated_at = Utc::now();
        update(task);
        Ok(task.clone())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_batch(&self, tasks: Vec<Task>) -> ImpresarioResult<Vec<Task>> {
        // One write-lock section: readers see the whole batch or none of it.
        let mut table = self.tasks.write().await;
        for task in &tasks {
            table.order.push(task.id.clone());
            table.rows.insert(task.id.clone(), task.clone());
        }
        Ok(tasks)
    }

    async fn list_pending(&self) -> ImpresarioResult<Vec<Task>> {
        let table = self.tasks.read().await;
        Ok(table
            .order
            .iter()
            .filter_map(|id| table.rows.get(id))
            .filter(|task| task.is_pending())
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: &str) -> ImpresarioResult<Option<Task>> {
        Ok(self.tasks.read().await.rows.get(id).cloned())
    }

    async fn mark_in_progress(&self, id: &str) -> ImpresarioResult<Task> {
        self.apply_transition(id, TaskStatus::InProgress, |_| {}).await
    }

    async fn mark_completed(&self, id: &str, output: OutputRef) -> ImpresarioResult<Task> {
        self.apply_transition(id, TaskStatus::Completed, |task| {
            task.output = Some(output);
        })
        .await
    }

    async fn mark_rejected(&self, id: &str, reason: &str) -> ImpresarioResult<Task> {
        self.apply_transition(id, TaskStatus::Rejected, |task| {
            task.rejection_reason = Some(reason.to_string());
        })
        .await
    }
}

#[async_trait]
impl ShowStore for MemoryStore {
    async fn create_entity(&self, new: NewEntity) -> ImpresarioResult<Entity> {
        let mut show = self.show.write().await;
        let id = bump(&mut show.entity_seq);
        let row = Entity {
            id,
            name: new.name,
            description: new.description,
            created_at: Utc::now(),
        };
        show.entities.insert(id, row.clone());
        Ok(row)
    }

    async fn update_entity_description(
        &self,
        id: i64,
        description: &str,
    ) -> ImpresarioResult<Entity> {
        let mut show = self.show.write().await;
        let row = show
            .entities
            .get_mut(&id)
            .ok_or_else(|| not_found("entities", id))?;
        row.description = description.to_string();
        Ok(row.clone())
    }

    async fn get_entity(&self, id: i64) -> ImpresarioResult<Option<Entity>> {
        Ok(self.show.read().await.entities.get(&id).cloned())
    }

    async fn find_entity_fuzzy(&self, name_fragment: &str) -> ImpresarioResult<Option<Entity>> {
        let needle = name_fragment.to_lowercase();
        let show = self.show.read().await;
        let mut rows: Vec<&Entity> = show.entities.values().collect();
        rows.sort_by_key(|e| e.id);
        Ok(rows
            .into_iter()
            .find(|e| e.name.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn list_entities(&self) -> ImpresarioResult<Vec<Entity>> {
        let show = self.show.read().await;
        let mut rows: Vec<Entity> = show.entities.values().cloned().collect();
        rows.sort_by_key(|e| e.id);
        Ok(rows)
    }

    async fn create_fact(&self, new: NewCanonFact) -> ImpresarioResult<CanonFact> {
        let mut show = self.show.write().await;
        let id = bump(&mut show.fact_seq);
        let row = CanonFact {
            id,
            fact: new.fact,
            entity_id: new.entity_id,
            created_at: Utc::now(),
        };
        show.facts.insert(id, row.clone());
        Ok(row)
    }

    async fn list_facts(&self, limit: i64) -> ImpresarioResult<Vec<CanonFact>> {
        let show = self.show.read().await;
        let mut rows: Vec<CanonFact> = show.facts.values().cloned().collect();
        rows.sort_by_key(|f| std::cmp::Reverse(f.id));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn list_rules(&self) -> ImpresarioResult<Vec<CanonRule>> {
        let show = self.show.read().await;
        let mut rows: Vec<CanonRule> = show.rules.values().cloned().collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn create_conflict(&self, new: NewConflict) -> ImpresarioResult<Conflict> {
        let mut show = self.show.write().await;
        let id = bump(&mut show.conflict_seq);
        let now = Utc::now();
        let row = Conflict {
            id,
            title: new.title,
            side_a: new.side_a,
            side_b: new.side_b,
            intensity: new.intensity.clamp(1, 10),
            status: ConflictStatus::Open,
            resolution: None,
            created_at: now,
            updated_at: now,
        };
        show.conflicts.insert(id, row.clone());
        Ok(row)
    }

    async fn get_conflict(&self, id: i64) -> ImpresarioResult<Option<Conflict>> {
        Ok(self.show.read().await.conflicts.get(&id).cloned())
    }

    async fn find_conflict_fuzzy(
        &self,
        title_fragment: &str,
    ) -> ImpresarioResult<Option<Conflict>> {
        let needle = title_fragment.to_lowercase();
        let show = self.show.read().await;
        let mut rows: Vec<&Conflict> = show.conflicts.values().collect();
        rows.sort_by_key(|c| c.id);
        Ok(rows
            .into_iter()
            .find(|c| c.title.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn escalate_conflict(
        &self,
        id: i64,
        intensity: Option<i32>,
    ) -> ImpresarioResult<Conflict> {
        let mut show = self.show.write().await;
        let row = show
            .conflicts
            .get_mut(&id)
            .ok_or_else(|| not_found("conflicts", id))?;
        row.intensity = intensity.unwrap_or(row.intensity + 1).clamp(1, 10);
        row.status = ConflictStatus::Escalated;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn resolve_conflict(&self, id: i64, resolution: &str) -> ImpresarioResult<Conflict> {
        let mut show = self.show.write().await;
        let row = show
            .conflicts
            .get_mut(&id)
            .ok_or_else(|| not_found("conflicts", id))?;
        row.status = ConflictStatus::Resolved;
        row.resolution = Some(resolution.to_string());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn list_open_conflicts(&self) -> ImpresarioResult<Vec<Conflict>> {
        let show = self.show.read().await;
        let mut rows: Vec<Conflict> = show
            .conflicts
            .values()
            .filter(|c| c.status.is_active())
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.id);
        Ok(rows)
    }

    async fn create_blueprint(&self, new: NewBlueprint) -> ImpresarioResult<Blueprint> {
        let mut show = self.show.write().await;
        let id = bump(&mut show.blueprint_seq);
        let row = Blueprint {
            id,
            entity_id: new.entity_id,
            title: new.title,
            visual_prompt: new.visual_prompt,
            style: new.style,
            status: new.status,
            created_at: Utc::now(),
        };
        show.blueprints.insert(id, row.clone());
        Ok(row)
    }

    async fn list_blueprints(&self) -> ImpresarioResult<Vec<Blueprint>> {
        let show = self.show.read().await;
        let mut rows: Vec<Blueprint> = show.blueprints.values().cloned().collect();
        rows.sort_by_key(|b| b.id);
        Ok(rows)
    }

    async fn create_teaser(&self, new: NewTeaser) -> ImpresarioResult<Teaser> {
        let mut show = self.show.write().await;
        let id = bump(&mut show.teaser_seq);
        let row = Teaser {
            id,
            entity_id: new.entity_id,
            content: new.content,
            speaker: new.speaker,
            tone: new.tone,
            priority: new.priority,
            status: new.status,
            created_at: Utc::now(),
        };
        show.teasers.insert(id, row.clone());
        Ok(row)
    }

    async fn list_recent_teasers(&self, limit: i64) -> ImpresarioResult<Vec<Teaser>> {
        let show = self.show.read().await;
        let mut rows: Vec<Teaser> = show.teasers.values().cloned().collect();
        rows.sort_by_key(|t| std::cmp::Reverse(t.id));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn create_script(&self, new: NewScript) -> ImpresarioResult<Script> {
        let mut show = self.show.write().await;
        let id = bump(&mut show.script_seq);
        let row = Script {
            id,
            title: new.title,
            synopsis: new.synopsis,
            shots: new.shots,
            status: new.status,
            created_at: Utc::now(),
        };
        show.scripts.insert(id, row.clone());
        Ok(row)
    }

    async fn list_scripts(&self) -> ImpresarioResult<Vec<Script>> {
        let show = self.show.read().await;
        let mut rows: Vec<Script> = show.scripts.values().cloned().collect();
        rows.sort_by_key(|s| s.id);
        Ok(rows)
    }

    async fn latest_episode(&self) -> ImpresarioResult<Option<Episode>> {
        let show = self.show.read().await;
        Ok(show
            .episodes
            .values()
            .max_by_key(|e| e.published_at)
            .cloned())
    }

    async fn table_counts(&self) -> ImpresarioResult<ShowCounts> {
        let show = self.show.read().await;
        Ok(ShowCounts {
            entities: show.entities.len() as i64,
            canon_facts: show.facts.len() as i64,
            canon_rules: show.rules.len() as i64,
            conflicts: show.conflicts.len() as i64,
            blueprints: show.blueprints.len() as i64,
            teasers: show.teasers.len() as i64,
            scripts: show.scripts.len() as i64,
            episodes: show.episodes.len() as i64,
        })
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn upsert_heartbeat(&self, heartbeat: Heartbeat) -> ImpresarioResult<()> {
        let mut telemetry = self.telemetry.write().await;
        telemetry
            .heartbeats
            .insert(heartbeat.worker_id.clone(), heartbeat);
        Ok(())
    }

    async fn list_heartbeats(&self) -> ImpresarioResult<Vec<Heartbeat>> {
        let telemetry = self.telemetry.read().await;
        let mut rows: Vec<Heartbeat> = telemetry.heartbeats.values().cloned().collect();
        rows.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        Ok(rows)
    }

    async fn append_audit(&self, entry: AuditEntry) -> ImpresarioResult<()> {
        self.telemetry.write().await.audit.push(entry);
        Ok(())
    }

    async fn list_audit(&self, limit: i64) -> ImpresarioResult<Vec<AuditEntry>> {
        let telemetry = self.telemetry.read().await;
        Ok(telemetry
            .audit
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
