//! Capability-scoped context assembly for worker tasks.
//!
//! Each role sees only the slice of show state its job needs. Name
//! references in a task's input refs are resolved against live storage,
//! not the snapshot: the referent may have been created by an earlier
//! task in the same cycle.

use crate::blackboard::Blackboard;
use impresario_core::{Entity, Task, WorkerRole};
use impresario_interface::ShowStore;
use serde_json::json;
use std::sync::Arc;

/// Input ref keys checked, in order, for the task's target entity.
const TARGET_KEYS: [&str; 3] = ["entity", "entity_name", "target"];

/// Builds the worker-facing context object for one task.
pub struct ContextBuilder {
    show: Arc<dyn ShowStore>,
}

impl ContextBuilder {
    /// Create a context builder over the live show store.
    pub fn new(show: Arc<dyn ShowStore>) -> Self {
        Self { show }
    }

    /// Build the context for a task, scoped to the worker's role.
    ///
    /// Infallible: a target that cannot be resolved degrades to
    /// `"target": null` with a warning, and store errors during
    /// resolution degrade the same way.
    #[tracing::instrument(skip(self, task, board), fields(task_id = %task.id, role = %role))]
    pub async fn build(
        &self,
        task: &Task,
        role: WorkerRole,
        board: &Blackboard,
    ) -> serde_json::Value {
        match role {
            WorkerRole::Lore => self.lore_context(board),
            WorkerRole::Design => self.design_context(task, board).await,
            WorkerRole::Script => self.script_context(task, board).await,
            WorkerRole::Drama => self.drama_context(board),
        }
    }

    /// Lore sees the whole canon: who exists, what the rules are, what
    /// has been established.
    fn lore_context(&self, board: &Blackboard) -> serde_json::Value {
        let entities: Vec<serde_json::Value> = board
            .entities
            .iter()
            .map(|e| json!({ "name": e.name, "description": e.description }))
            .collect();
        let rules: Vec<&str> = board.rules.iter().map(|r| r.rule.as_str()).collect();
        let facts: Vec<&str> = board.recent_facts.iter().map(|f| f.fact.as_str()).collect();

        json!({
            "entities": entities,
            "canon_rules": rules,
            "recent_facts": facts,
        })
    }

    /// Design sees its target and what has already been designed.
    async fn design_context(&self, task: &Task, board: &Blackboard) -> serde_json::Value {
        let target = self.resolve_target(task).await;
        let titles: Vec<&str> = board.blueprints.iter().map(|b| b.title.as_str()).collect();

        json!({
            "target": target.map(entity_json),
            "existing_blueprints": titles,
        })
    }

    /// Script sees its target, the conflicts that mention it, and the
    /// recent teasers it should stay consistent with.
    async fn script_context(&self, task: &Task, board: &Blackboard) -> serde_json::Value {
        let target = self.resolve_target(task).await;

        let conflicts: Vec<serde_json::Value> = match &target {
            Some(entity) => {
                let needle = entity.name.to_lowercase();
                let mentioning: Vec<serde_json::Value> = board
                    .open_conflicts
                    .iter()
                    .filter(|c| {
                        c.title.to_lowercase().contains(&needle)
                            || c.side_a.to_lowercase().contains(&needle)
                            || c.side_b.to_lowercase().contains(&needle)
                    })
                    .map(conflict_json)
                    .collect();
                if mentioning.is_empty() {
                    board.open_conflicts.iter().map(conflict_json).collect()
                } else {
                    mentioning
                }
            }
            None => board.open_conflicts.iter().map(conflict_json).collect(),
        };

        let teasers: Vec<serde_json::Value> = board
            .recent_teasers
            .iter()
            .map(|t| {
                json!({
                    "content": t.content,
                    "speaker": t.speaker,
                    "tone": t.tone,
                })
            })
            .collect();

        json!({
            "target": target.map(entity_json),
            "conflicts": conflicts,
            "recent_teasers": teasers,
        })
    }

    /// Drama sees the roster and the open tensions between its members.
    fn drama_context(&self, board: &Blackboard) -> serde_json::Value {
        let roster: Vec<serde_json::Value> = board
            .entities
            .iter()
            .map(|e| json!({ "name": e.name, "description": e.description }))
            .collect();
        let conflicts: Vec<serde_json::Value> =
            board.open_conflicts.iter().map(conflict_json).collect();

        json!({
            "roster": roster,
            "open_conflicts": conflicts,
        })
    }

    /// Resolve the task's target entity reference against live storage.
    ///
    /// Accepts a numeric id or a name under `entity`, `entity_name`, or
    /// `target`. Misses and store failures return `None` with a warning.
    async fn resolve_target(&self, task: &Task) -> Option<Entity> {
        let reference = TARGET_KEYS
            .iter()
            .find_map(|key| task.input_refs.get(*key))?;

        if let Some(id) = reference.as_i64() {
            return match self.show.get_entity(id).await {
                Ok(Some(entity)) => Some(entity),
                Ok(None) => {
                    tracing::warn!(task_id = %task.id, entity_id = id, "Target entity id not found");
                    None
                }
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "Target lookup failed");
                    None
                }
            };
        }

        let name = reference.as_str()?;
        match self.show.find_entity_fuzzy(name).await {
            Ok(Some(entity)) => Some(entity),
            Ok(None) => {
                tracing::warn!(task_id = %task.id, target = name, "Target entity name not found");
                None
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "Target lookup failed");
                None
            }
        }
    }
}

fn entity_json(entity: Entity) -> serde_json::Value {
    json!({
        "id": entity.id,
        "name": entity.name,
        "description": entity.description,
    })
}

fn conflict_json(conflict: &impresario_core::Conflict) -> serde_json::Value {
    json!({
        "title": conflict.title,
        "side_a": conflict.side_a,
        "side_b": conflict.side_b,
        "intensity": conflict.intensity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use impresario_core::{NewConflict, NewEntity, TaskDraft};
    use impresario_storage::MemoryStore;

    fn task_for(worker: &str, task_type: &str, input_refs: serde_json::Value) -> Task {
        let draft = TaskDraft::new(worker, task_type, "test task").with_input_refs(input_refs);
        Task::from_draft(draft, format!("worker-{worker}"))
    }

    async fn store_with_cast() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .create_entity(NewEntity {
                name: "Captain Vex".to_string(),
                description: "A disgraced captain".to_string(),
            })
            .await
            .unwrap();
        store
            .create_entity(NewEntity {
                name: "The Broker".to_string(),
                description: "An information dealer".to_string(),
            })
            .await
            .unwrap();
        store.seed_rule("Nobody dies on screen").await;
        store
    }

    #[tokio::test]
    async fn test_lore_context_sees_canon() {
        let store = store_with_cast().await;
        let board = Blackboard::assemble(store.as_ref(), store.as_ref())
            .await
            .unwrap();
        let builder = ContextBuilder::new(store);

        let task = task_for("lore", "record_fact", json!({}));
        let context = builder.build(&task, WorkerRole::Lore, &board).await;

        assert_eq!(context["entities"].as_array().unwrap().len(), 2);
        assert_eq!(context["canon_rules"][0], "Nobody dies on screen");
        assert!(context.get("target").is_none());
    }

    #[tokio::test]
    async fn test_design_context_resolves_target_live() {
        let store = store_with_cast().await;
        // Snapshot taken before the referent exists.
        let board = Blackboard::assemble(store.as_ref(), store.as_ref())
            .await
            .unwrap();
        store
            .create_entity(NewEntity {
                name: "Nova Station".to_string(),
                description: "A derelict orbital".to_string(),
            })
            .await
            .unwrap();

        let builder = ContextBuilder::new(store);
        let task = task_for(
            "design",
            "design_blueprint",
            json!({"entity_name": "nova station"}),
        );
        let context = builder.build(&task, WorkerRole::Design, &board).await;

        assert_eq!(context["target"]["name"], "Nova Station");
    }

    #[tokio::test]
    async fn test_unresolvable_target_degrades_to_null() {
        let store = store_with_cast().await;
        let board = Blackboard::assemble(store.as_ref(), store.as_ref())
            .await
            .unwrap();
        let builder = ContextBuilder::new(store);

        let task = task_for(
            "design",
            "design_blueprint",
            json!({"entity_name": "nobody by this name"}),
        );
        let context = builder.build(&task, WorkerRole::Design, &board).await;

        assert!(context["target"].is_null());
        assert!(context["existing_blueprints"].as_array().is_some());
    }

    #[tokio::test]
    async fn test_numeric_entity_ref_resolves_by_id() {
        let store = store_with_cast().await;
        let board = Blackboard::assemble(store.as_ref(), store.as_ref())
            .await
            .unwrap();
        let builder = ContextBuilder::new(store);

        let task = task_for("design", "design_blueprint", json!({"entity": 2}));
        let context = builder.build(&task, WorkerRole::Design, &board).await;

        assert_eq!(context["target"]["name"], "The Broker");
    }

    #[tokio::test]
    async fn test_script_context_filters_conflicts_by_target() {
        let store = store_with_cast().await;
        store
            .create_conflict(NewConflict {
                title: "The ledger".to_string(),
                side_a: "Captain Vex".to_string(),
                side_b: "The Broker".to_string(),
                intensity: 4,
            })
            .await
            .unwrap();
        store
            .create_conflict(NewConflict {
                title: "Dock strike".to_string(),
                side_a: "Dockworkers".to_string(),
                side_b: "Station authority".to_string(),
                intensity: 2,
            })
            .await
            .unwrap();

        let board = Blackboard::assemble(store.as_ref(), store.as_ref())
            .await
            .unwrap();
        let builder = ContextBuilder::new(store);

        let task = task_for("script", "write_script", json!({"target": "captain vex"}));
        let context = builder.build(&task, WorkerRole::Script, &board).await;

        let conflicts = context["conflicts"].as_array().unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0]["title"], "The ledger");
    }

    #[tokio::test]
    async fn test_script_context_without_target_sees_all_open_conflicts() {
        let store = store_with_cast().await;
        store
            .create_conflict(NewConflict {
                title: "Dock strike".to_string(),
                side_a: "Dockworkers".to_string(),
                side_b: "Station authority".to_string(),
                intensity: 2,
            })
            .await
            .unwrap();

        let board = Blackboard::assemble(store.as_ref(), store.as_ref())
            .await
            .unwrap();
        let builder = ContextBuilder::new(store);

        let task = task_for("script", "write_script", json!({}));
        let context = builder.build(&task, WorkerRole::Script, &board).await;

        assert!(context["target"].is_null());
        assert_eq!(context["conflicts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_drama_context_sees_roster_and_conflicts() {
        let store = store_with_cast().await;
        let board = Blackboard::assemble(store.as_ref(), store.as_ref())
            .await
            .unwrap();
        let builder = ContextBuilder::new(store);

        let task = task_for("drama", "create_conflict", json!({}));
        let context = builder.build(&task, WorkerRole::Drama, &board).await;

        assert_eq!(context["roster"].as_array().unwrap().len(), 2);
        assert_eq!(context["open_conflicts"].as_array().unwrap().len(), 0);
    }
}
