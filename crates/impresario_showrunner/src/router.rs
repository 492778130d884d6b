//! Routes raw worker output into the show's destination tables.
//!
//! Three stages: normalize the declared task type, dispatch the canonical
//! type to a destination-specific write, and fall back to shape inference
//! when the declared type matches nothing. `route` is total: store write
//! failures and unrecognized shapes yield a null record id or an unknown
//! destination, never an error.

use impresario_core::{
    Conflict, Destination, NewBlueprint, NewCanonFact, NewConflict, NewEntity, NewScript,
    NewTeaser, OutputRef, Task,
};
use impresario_error::ImpresarioError;
use impresario_interface::ShowStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_PRIORITY: i32 = 5;
const DEFAULT_INTENSITY: i32 = 5;
const DRAFT_STATUS: &str = "draft";

/// Maps task-type synonyms onto canonical names.
///
/// Normalization lowercases, trims, and underscores the input before the
/// synonym lookup, so `"New Entity"` and `"new-entity"` converge. Already
/// canonical names pass through unchanged, which makes the map idempotent.
#[derive(Debug, Clone)]
pub struct TypeNormalizer {
    synonyms: HashMap<String, String>,
}

impl TypeNormalizer {
    /// Build the normalizer with the built-in synonym groups.
    pub fn new() -> Self {
        let mut synonyms = HashMap::new();
        let groups: [(&str, &[&str]); 9] = [
            (
                "create_entity",
                &["new_entity", "add_entity", "entity", "create_character", "new_character"],
            ),
            (
                "update_entity",
                &["edit_entity", "modify_entity", "revise_entity"],
            ),
            (
                "record_fact",
                &["add_fact", "new_fact", "fact", "canon_fact", "record_canon_fact"],
            ),
            (
                "create_conflict",
                &["new_conflict", "conflict", "start_conflict", "open_conflict"],
            ),
            (
                "escalate_conflict",
                &["intensify_conflict", "raise_conflict", "deepen_conflict"],
            ),
            (
                "resolve_conflict",
                &["close_conflict", "end_conflict", "settle_conflict"],
            ),
            (
                "design_blueprint",
                &["create_blueprint", "new_blueprint", "blueprint", "visual_design", "design_visual"],
            ),
            (
                "write_teaser",
                &["create_teaser", "new_teaser", "teaser", "tease"],
            ),
            (
                "write_script",
                &["create_script", "new_script", "script", "write_episode", "episode_script"],
            ),
        ];
        for (canonical, aliases) in groups {
            for alias in aliases {
                synonyms.insert((*alias).to_string(), canonical.to_string());
            }
        }
        Self { synonyms }
    }

    /// Add a synonym mapping.
    pub fn with_synonym(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.synonyms.insert(from.into(), to.into());
        self
    }

    /// Normalize a declared task type to its canonical name.
    ///
    /// Unmapped types pass through cleaned but otherwise unchanged.
    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match self.synonyms.get(&cleaned) {
            Some(canonical) => canonical.clone(),
            None => cleaned,
        }
    }
}

impl Default for TypeNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes routed worker output into the show store.
pub struct OutputRouter {
    show: Arc<dyn ShowStore>,
    normalizer: TypeNormalizer,
}

impl OutputRouter {
    /// Create a router over the live show store.
    pub fn new(show: Arc<dyn ShowStore>) -> Self {
        Self {
            show,
            normalizer: TypeNormalizer::new(),
        }
    }

    /// Replace the type normalizer.
    pub fn with_normalizer(mut self, normalizer: TypeNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Route one task's raw output to its destination table.
    ///
    /// Total: an unrecognized type falls back to shape inference, an
    /// unrecognized shape yields [`OutputRef::unknown`], and store write
    /// failures yield a null record id. Never returns an error.
    #[tracing::instrument(skip(self, task, raw), fields(task_id = %task.id, task_type = %task.task_type))]
    pub async fn route(&self, task: &Task, raw: &Value) -> OutputRef {
        let canonical = self.normalizer.normalize(&task.task_type);

        if let Some(output) = self.dispatch(&canonical, task, raw).await {
            return output;
        }

        match infer_task_type(raw) {
            Some(inferred) => {
                tracing::info!(
                    declared = %task.task_type,
                    inferred = %inferred,
                    "Declared type unrecognized, routing by output shape"
                );
                match self.dispatch(inferred, task, raw).await {
                    Some(output) => output,
                    None => OutputRef::unknown(),
                }
            }
            None => {
                tracing::warn!(
                    declared = %task.task_type,
                    fields = %field_names(raw),
                    "Output matched no destination, recording unknown"
                );
                OutputRef::unknown()
            }
        }
    }

    /// Dispatch a canonical type to its destination write. `None` when the
    /// type is not in the table.
    async fn dispatch(&self, canonical: &str, task: &Task, raw: &Value) -> Option<OutputRef> {
        let output = match canonical {
            "create_entity" => self.route_entities(raw).await,
            "update_entity" => self.route_entity_update(task, raw).await,
            "record_fact" => self.route_fact(task, raw).await,
            "create_conflict" => self.route_new_conflict(raw).await,
            "escalate_conflict" => self.route_escalation(task, raw).await,
            "resolve_conflict" => self.route_resolution(task, raw).await,
            "design_blueprint" => self.route_blueprint(task, raw).await,
            "write_teaser" => self.route_teaser(task, raw).await,
            "write_script" => self.route_script(raw).await,
            _ => return None,
        };
        Some(output)
    }

    /// Entity output: a single object, a top-level array, or an
    /// `{"entities": [...]}` batch. Items write independently; the first
    /// successful id is recorded.
    async fn route_entities(&self, raw: &Value) -> OutputRef {
        let items: Vec<&Value> = match raw {
            Value::Array(items) => items.iter().collect(),
            _ => match raw.get("entities").and_then(Value::as_array) {
                Some(items) => items.iter().collect(),
                None => vec![raw],
            },
        };

        let mut first_id = None;
        for item in items {
            if let Some(id) = self.insert_entity(item).await {
                first_id.get_or_insert(id);
            }
        }
        OutputRef::new(Destination::Entities, first_id)
    }

    async fn insert_entity(&self, item: &Value) -> Option<i64> {
        let Some(name) = first_str(item, &["name", "entity_name", "title"]) else {
            tracing::warn!(fields = %field_names(item), "Entity output without a name, skipping");
            return None;
        };
        let description = first_str(item, &["description", "summary", "bio", "about"])
            .unwrap_or_default()
            .to_string();

        match self
            .show
            .create_entity(NewEntity {
                name: name.to_string(),
                description,
            })
            .await
        {
            Ok(row) => Some(row.id),
            Err(e) => {
                warn_write_failed(Destination::Entities, &e);
                None
            }
        }
    }

    /// Update by id, else by fuzzy name, else insert as a new entity.
    async fn route_entity_update(&self, task: &Task, raw: &Value) -> OutputRef {
        let description = first_str(raw, &["description", "new_description", "summary", "bio"]);
        let Some(description) = description else {
            tracing::warn!(task_id = %task.id, "Entity update without a description");
            return OutputRef::new(Destination::Entities, None);
        };

        if let Some(id) = first_i64(raw, &["id", "entity_id"])
            .or_else(|| first_i64(&task.input_refs, &["entity", "entity_id"]))
        {
            return match self.show.update_entity_description(id, description).await {
                Ok(row) => OutputRef::new(Destination::Entities, Some(row.id)),
                Err(e) => warn_write_failed(Destination::Entities, &e),
            };
        }

        let name = first_str(raw, &["name", "entity_name", "title"])
            .or_else(|| first_str(&task.input_refs, &["entity", "entity_name", "target"]));
        let Some(name) = name else {
            tracing::warn!(task_id = %task.id, "Entity update names no entity");
            return OutputRef::new(Destination::Entities, None);
        };

        match self.show.find_entity_fuzzy(name).await {
            Ok(Some(existing)) => {
                match self
                    .show
                    .update_entity_description(existing.id, description)
                    .await
                {
                    Ok(row) => OutputRef::new(Destination::Entities, Some(row.id)),
                    Err(e) => warn_write_failed(Destination::Entities, &e),
                }
            }
            Ok(None) => {
                tracing::info!(name = %name, "Update target not found, inserting instead");
                match self
                    .show
                    .create_entity(NewEntity {
                        name: name.to_string(),
                        description: description.to_string(),
                    })
                    .await
                {
                    Ok(row) => OutputRef::new(Destination::Entities, Some(row.id)),
                    Err(e) => warn_write_failed(Destination::Entities, &e),
                }
            }
            Err(e) => warn_write_failed(Destination::Entities, &e),
        }
    }

    async fn route_fact(&self, task: &Task, raw: &Value) -> OutputRef {
        let Some(fact) = first_str(raw, &["fact", "content", "text", "note"]) else {
            tracing::warn!(task_id = %task.id, "Fact output without a fact");
            return OutputRef::new(Destination::CanonFacts, None);
        };
        let entity_id = self.resolve_entity_link(task, raw).await;

        match self
            .show
            .create_fact(NewCanonFact {
                fact: fact.to_string(),
                entity_id,
            })
            .await
        {
            Ok(row) => OutputRef::new(Destination::CanonFacts, Some(row.id)),
            Err(e) => warn_write_failed(Destination::CanonFacts, &e),
        }
    }

    async fn route_new_conflict(&self, raw: &Value) -> OutputRef {
        let side_a = first_str(raw, &["side_a", "a", "protagonist"]);
        let side_b = first_str(raw, &["side_b", "b", "antagonist"]);
        let (Some(side_a), Some(side_b)) = (side_a, side_b) else {
            tracing::warn!(fields = %field_names(raw), "Conflict output missing a side");
            return OutputRef::new(Destination::Conflicts, None);
        };
        let title = first_str(raw, &["title", "name"])
            .map(str::to_string)
            .unwrap_or_else(|| format!("{side_a} vs {side_b}"));
        let intensity = first_i64(raw, &["intensity"])
            .map(|v| v as i32)
            .unwrap_or(DEFAULT_INTENSITY);

        match self
            .show
            .create_conflict(NewConflict {
                title,
                side_a: side_a.to_string(),
                side_b: side_b.to_string(),
                intensity,
            })
            .await
        {
            Ok(row) => OutputRef::new(Destination::Conflicts, Some(row.id)),
            Err(e) => warn_write_failed(Destination::Conflicts, &e),
        }
    }

    /// Escalate by id, else by fuzzy title, else create the conflict the
    /// output describes and escalate it.
    async fn route_escalation(&self, task: &Task, raw: &Value) -> OutputRef {
        let intensity = first_i64(raw, &["intensity", "new_intensity"]).map(|v| v as i32);

        let target = match self.find_conflict(task, raw).await {
            Ok(target) => target,
            Err(e) => return warn_write_failed(Destination::Conflicts, &e),
        };

        if let Some(existing) = target {
            return match self.show.escalate_conflict(existing.id, intensity).await {
                Ok(row) => OutputRef::new(Destination::Conflicts, Some(row.id)),
                Err(e) => warn_write_failed(Destination::Conflicts, &e),
            };
        }

        let created = self.route_new_conflict(raw).await;
        match created.record_id {
            Some(id) => match self.show.escalate_conflict(id, intensity).await {
                Ok(row) => OutputRef::new(Destination::Conflicts, Some(row.id)),
                Err(e) => warn_write_failed(Destination::Conflicts, &e),
            },
            None => created,
        }
    }

    /// Resolve by id, else by fuzzy title, else create-and-resolve when
    /// the output carries both sides.
    async fn route_resolution(&self, task: &Task, raw: &Value) -> OutputRef {
        let resolution = first_str(raw, &["resolution", "outcome", "result"])
            .unwrap_or("Resolved")
            .to_string();

        let target = match self.find_conflict(task, raw).await {
            Ok(target) => target,
            Err(e) => return warn_write_failed(Destination::Conflicts, &e),
        };

        if let Some(existing) = target {
            return match self.show.resolve_conflict(existing.id, &resolution).await {
                Ok(row) => OutputRef::new(Destination::Conflicts, Some(row.id)),
                Err(e) => warn_write_failed(Destination::Conflicts, &e),
            };
        }

        let created = self.route_new_conflict(raw).await;
        match created.record_id {
            Some(id) => match self.show.resolve_conflict(id, &resolution).await {
                Ok(row) => OutputRef::new(Destination::Conflicts, Some(row.id)),
                Err(e) => warn_write_failed(Destination::Conflicts, &e),
            },
            None => {
                tracing::warn!(task_id = %task.id, "Resolution names no known conflict");
                created
            }
        }
    }

    async fn route_blueprint(&self, task: &Task, raw: &Value) -> OutputRef {
        let visual_prompt = first_str(raw, &["visual_prompt", "image_prompt", "prompt", "visual"]);
        let Some(visual_prompt) = visual_prompt else {
            tracing::warn!(task_id = %task.id, "Blueprint output without a visual prompt");
            return OutputRef::new(Destination::Blueprints, None);
        };
        let entity_id = self.resolve_entity_link(task, raw).await;
        let title = first_str(raw, &["title", "name"])
            .map(str::to_string)
            .unwrap_or_else(|| "Untitled blueprint".to_string());
        let style = first_str(raw, &["style", "art_style"]).map(str::to_string);

        match self
            .show
            .create_blueprint(NewBlueprint {
                entity_id,
                title,
                visual_prompt: visual_prompt.to_string(),
                style,
                status: DRAFT_STATUS.to_string(),
            })
            .await
        {
            Ok(row) => OutputRef::new(Destination::Blueprints, Some(row.id)),
            Err(e) => warn_write_failed(Destination::Blueprints, &e),
        }
    }

    async fn route_teaser(&self, task: &Task, raw: &Value) -> OutputRef {
        let content = first_str(raw, &["content", "monologue", "text", "dialogue"]);
        let Some(content) = content else {
            tracing::warn!(task_id = %task.id, "Teaser output without content");
            return OutputRef::new(Destination::Teasers, None);
        };
        let entity_id = self.resolve_entity_link(task, raw).await;
        let speaker = first_str(raw, &["speaker", "character", "voice"]).map(str::to_string);
        let tone = first_str(raw, &["tone", "mood"]).map(str::to_string);
        let priority = first_i64(raw, &["priority"])
            .map(|v| v as i32)
            .unwrap_or(DEFAULT_PRIORITY);

        match self
            .show
            .create_teaser(NewTeaser {
                entity_id,
                content: content.to_string(),
                speaker,
                tone,
                priority,
                status: DRAFT_STATUS.to_string(),
            })
            .await
        {
            Ok(row) => OutputRef::new(Destination::Teasers, Some(row.id)),
            Err(e) => warn_write_failed(Destination::Teasers, &e),
        }
    }

    /// A script object, or a bare array treated as the shot list of one
    /// untitled script.
    async fn route_script(&self, raw: &Value) -> OutputRef {
        let (title, synopsis, shots) = match raw {
            Value::Array(_) => ("Untitled script".to_string(), None, raw.clone()),
            _ => {
                let title = first_str(raw, &["title", "name", "episode_title"])
                    .map(str::to_string)
                    .unwrap_or_else(|| "Untitled script".to_string());
                let synopsis =
                    first_str(raw, &["synopsis", "summary", "logline"]).map(str::to_string);
                let shots = ["shots", "shot_list", "scenes"]
                    .iter()
                    .find_map(|key| raw.get(*key))
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new()));
                (title, synopsis, shots)
            }
        };

        match self
            .show
            .create_script(NewScript {
                title,
                synopsis,
                shots,
                status: DRAFT_STATUS.to_string(),
            })
            .await
        {
            Ok(row) => OutputRef::new(Destination::Scripts, Some(row.id)),
            Err(e) => warn_write_failed(Destination::Scripts, &e),
        }
    }

    /// Resolve an entity link from the output or the task's input refs.
    /// Best-effort: misses and store errors degrade to no link.
    async fn resolve_entity_link(&self, task: &Task, raw: &Value) -> Option<i64> {
        if let Some(id) = first_i64(raw, &["entity_id"]) {
            return Some(id);
        }
        let name = first_str(raw, &["entity_name", "entity", "character"])
            .or_else(|| first_str(&task.input_refs, &["entity", "entity_name", "target"]))?;

        match self.show.find_entity_fuzzy(name).await {
            Ok(Some(entity)) => Some(entity.id),
            Ok(None) => {
                tracing::debug!(name = %name, "Entity link not found, leaving output unlinked");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Entity link lookup failed");
                None
            }
        }
    }

    /// Find the conflict an output refers to: id keys first, then a fuzzy
    /// title match.
    async fn find_conflict(
        &self,
        task: &Task,
        raw: &Value,
    ) -> Result<Option<Conflict>, ImpresarioError> {
        if let Some(id) = first_i64(raw, &["conflict_id", "id"])
            .or_else(|| first_i64(&task.input_refs, &["conflict_id", "conflict"]))
        {
            return self.show.get_conflict(id).await;
        }

        let title = first_str(raw, &["title", "conflict_title", "conflict", "name"])
            .or_else(|| first_str(&task.input_refs, &["conflict", "title", "conflict_title"]));
        match title {
            Some(title) => self.show.find_conflict_fuzzy(title).await,
            None => Ok(None),
        }
    }
}

/// Classify an output by shape when its declared type matched nothing.
fn infer_task_type(raw: &Value) -> Option<&'static str> {
    let probe = match raw {
        Value::Array(items) => items.first()?,
        _ => raw,
    };
    let obj = probe.as_object()?;

    if obj.contains_key("side_a") && obj.contains_key("side_b") {
        Some("create_conflict")
    } else if obj.contains_key("visual_prompt") || obj.contains_key("image_prompt") {
        Some("design_blueprint")
    } else if obj.contains_key("shots") || obj.contains_key("shot_list") {
        Some("write_script")
    } else if obj.contains_key("content") && obj.contains_key("speaker") && obj.contains_key("tone")
    {
        Some("write_teaser")
    } else if obj.contains_key("fact") {
        Some("record_fact")
    } else if obj.contains_key("name") && obj.contains_key("description") {
        Some("create_entity")
    } else {
        None
    }
}

/// First present string value among the given keys.
fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

/// First present integer value among the given keys.
fn first_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_i64))
}

fn field_names(value: &Value) -> String {
    match value.as_object() {
        Some(obj) => obj.keys().cloned().collect::<Vec<_>>().join(", "),
        None => match value {
            Value::Array(_) => "<array>".to_string(),
            _ => "<non-object>".to_string(),
        },
    }
}

fn warn_write_failed(destination: Destination, error: &ImpresarioError) -> OutputRef {
    tracing::warn!(destination = %destination, error = %error, "Store write failed, recording null output");
    OutputRef::new(destination, None)
}
