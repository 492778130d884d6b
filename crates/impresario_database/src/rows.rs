//! Row structs bridging Diesel tables and domain types.
//!
//! Status columns are stored as text, so converting a row back to its
//! domain type can fail on data written by anything other than this crate.
//! Those conversions are `TryFrom`; the rest are plain `From`.

use crate::schema::{
    audit_log, blueprints, canon_facts, conflicts, entities, heartbeats, scripts, tasks, teasers,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use impresario_core::{
    AuditEntry, Blueprint, CanonFact, CanonRule, Conflict, Entity, Episode, Heartbeat,
    NewBlueprint, NewCanonFact, NewConflict, NewEntity, NewScript, NewTeaser, OutputRef, Script,
    Task, Teaser,
};
use impresario_error::{ImpresarioError, StorageError, StorageErrorKind};

pub(crate) fn conversion_failed(detail: impl std::fmt::Display) -> ImpresarioError {
    StorageError::new(StorageErrorKind::Conversion(detail.to_string())).into()
}

#[derive(Debug, Clone, Queryable)]
pub struct TaskRow {
    pub id: String,
    pub seq: i64,
    pub worker: String,
    pub worker_id: String,
    pub task_type: String,
    pub description: String,
    pub priority: i32,
    pub input_refs: serde_json::Value,
    pub status: String,
    pub output_destination: Option<String>,
    pub output_record_id: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert form of a task. Output fields stay NULL until routing.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    pub id: String,
    pub worker: String,
    pub worker_id: String,
    pub task_type: String,
    pub description: String,
    pub priority: i32,
    pub input_refs: serde_json::Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for NewTaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            worker: task.worker.clone(),
            worker_id: task.worker_id.clone(),
            task_type: task.task_type.clone(),
            description: task.description.clone(),
            priority: task.priority,
            input_refs: task.input_refs.clone(),
            status: task.status.as_str().to_string(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl TryFrom<TaskRow> for Task {
    type Error = ImpresarioError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(conversion_failed)?;
        let output = match row.output_destination {
            Some(dest) => Some(OutputRef {
                destination: dest.parse().map_err(conversion_failed)?,
                record_id: row.output_record_id,
            }),
            None => None,
        };
        Ok(Task {
            id: row.id,
            worker: row.worker,
            worker_id: row.worker_id,
            task_type: row.task_type,
            description: row.description,
            priority: row.priority,
            input_refs: row.input_refs,
            status,
            output,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct EntityRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<EntityRow> for Entity {
    fn from(row: EntityRow) -> Self {
        Entity {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = entities)]
pub struct NewEntityRow {
    pub name: String,
    pub description: String,
}

impl From<NewEntity> for NewEntityRow {
    fn from(new: NewEntity) -> Self {
        Self {
            name: new.name,
            description: new.description,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct CanonFactRow {
    pub id: i64,
    pub fact: String,
    pub entity_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<CanonFactRow> for CanonFact {
    fn from(row: CanonFactRow) -> Self {
        CanonFact {
            id: row.id,
            fact: row.fact,
            entity_id: row.entity_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = canon_facts)]
pub struct NewCanonFactRow {
    pub fact: String,
    pub entity_id: Option<i64>,
}

impl From<NewCanonFact> for NewCanonFactRow {
    fn from(new: NewCanonFact) -> Self {
        Self {
            fact: new.fact,
            entity_id: new.entity_id,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct CanonRuleRow {
    pub id: i64,
    pub rule: String,
}

impl From<CanonRuleRow> for CanonRule {
    fn from(row: CanonRuleRow) -> Self {
        CanonRule {
            id: row.id,
            rule: row.rule,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct ConflictRow {
    pub id: i64,
    pub title: String,
    pub side_a: String,
    pub side_b: String,
    pub intensity: i32,
    pub status: String,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ConflictRow> for Conflict {
    type Error = ImpresarioError;

    fn try_from(row: ConflictRow) -> Result<Self, Self::Error> {
        Ok(Conflict {
            id: row.id,
            title: row.title,
            side_a: row.side_a,
            side_b: row.side_b,
            intensity: row.intensity,
            status: row.status.parse().map_err(conversion_failed)?,
            resolution: row.resolution,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insert form of a conflict. Status and timestamps come from table
/// defaults: new conflicts open at insert time.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conflicts)]
pub struct NewConflictRow {
    pub title: String,
    pub side_a: String,
    pub side_b: String,
    pub intensity: i32,
}

impl From<NewConflict> for NewConflictRow {
    fn from(new: NewConflict) -> Self {
        Self {
            title: new.title,
            side_a: new.side_a,
            side_b: new.side_b,
            intensity: new.intensity,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct BlueprintRow {
    pub id: i64,
    pub entity_id: Option<i64>,
    pub title: String,
    pub visual_prompt: String,
    pub style: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<BlueprintRow> for Blueprint {
    fn from(row: BlueprintRow) -> Self {
        Blueprint {
            id: row.id,
            entity_id: row.entity_id,
            title: row.title,
            visual_prompt: row.visual_prompt,
            style: row.style,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = blueprints)]
pub struct NewBlueprintRow {
    pub entity_id: Option<i64>,
    pub title: String,
    pub visual_prompt: String,
    pub style: Option<String>,
    pub status: String,
}

impl From<NewBlueprint> for NewBlueprintRow {
    fn from(new: NewBlueprint) -> Self {
        Self {
            entity_id: new.entity_id,
            title: new.title,
            visual_prompt: new.visual_prompt,
            style: new.style,
            status: new.status,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct TeaserRow {
    pub id: i64,
    pub entity_id: Option<i64>,
    pub content: String,
    pub speaker: Option<String>,
    pub tone: Option<String>,
    pub priority: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<TeaserRow> for Teaser {
    fn from(row: TeaserRow) -> Self {
        Teaser {
            id: row.id,
            entity_id: row.entity_id,
            content: row.content,
            speaker: row.speaker,
            tone: row.tone,
            priority: row.priority,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = teasers)]
pub struct NewTeaserRow {
    pub entity_id: Option<i64>,
    pub content: String,
    pub speaker: Option<String>,
    pub tone: Option<String>,
    pub priority: i32,
    pub status: String,
}

impl From<NewTeaser> for NewTeaserRow {
    fn from(new: NewTeaser) -> Self {
        Self {
            entity_id: new.entity_id,
            content: new.content,
            speaker: new.speaker,
            tone: new.tone,
            priority: new.priority,
            status: new.status,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct ScriptRow {
    pub id: i64,
    pub title: String,
    pub synopsis: Option<String>,
    pub shots: serde_json::Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<ScriptRow> for Script {
    fn from(row: ScriptRow) -> Self {
        Script {
            id: row.id,
            title: row.title,
            synopsis: row.synopsis,
            shots: row.shots,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = scripts)]
pub struct NewScriptRow {
    pub title: String,
    pub synopsis: Option<String>,
    pub shots: serde_json::Value,
    pub status: String,
}

impl From<NewScript> for NewScriptRow {
    fn from(new: NewScript) -> Self {
        Self {
            title: new.title,
            synopsis: new.synopsis,
            shots: new.shots,
            status: new.status,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct EpisodeRow {
    pub id: i64,
    pub title: String,
    pub video_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl From<EpisodeRow> for Episode {
    fn from(row: EpisodeRow) -> Self {
        Episode {
            id: row.id,
            title: row.title,
            video_url: row.video_url,
            published_at: row.published_at,
        }
    }
}

/// Heartbeat rows are both inserted and upserted whole, so one struct
/// serves as query, insert, and changeset form. `treat_none_as_null`
/// makes an upsert clear a stale detail column.
#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = heartbeats, treat_none_as_null = true)]
pub struct HeartbeatRow {
    pub worker_id: String,
    pub worker_name: String,
    pub status: String,
    pub detail: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Heartbeat> for HeartbeatRow {
    fn from(beat: &Heartbeat) -> Self {
        Self {
            worker_id: beat.worker_id.clone(),
            worker_name: beat.worker_name.clone(),
            status: beat.status.as_str().to_string(),
            detail: beat.detail.clone(),
            updated_at: beat.updated_at,
        }
    }
}

impl TryFrom<HeartbeatRow> for Heartbeat {
    type Error = ImpresarioError;

    fn try_from(row: HeartbeatRow) -> Result<Self, Self::Error> {
        Ok(Heartbeat {
            worker_id: row.worker_id,
            worker_name: row.worker_name,
            status: row.status.parse().map_err(conversion_failed)?,
            detail: row.detail,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct AuditRow {
    pub id: i64,
    pub category: String,
    pub action: String,
    pub allowed: bool,
    pub reason: Option<String>,
    pub digest: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            category: row.category,
            action: row.action,
            allowed: row.allowed,
            reason: row.reason,
            digest: row.digest,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_log)]
pub struct NewAuditRow {
    pub category: String,
    pub action: String,
    pub allowed: bool,
    pub reason: Option<String>,
    pub digest: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&AuditEntry> for NewAuditRow {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            category: entry.category.clone(),
            action: entry.action.clone(),
            allowed: entry.allowed,
            reason: entry.reason.clone(),
            digest: entry.digest.clone(),
            created_at: entry.created_at,
        }
    }
}
