//! The per-cycle snapshot of show state.
//!
//! Assembled once at the top of each cycle and handed read-only to the
//! decision engine and the context builder. Task execution never mutates
//! it; the only live re-query during a cycle is the context builder's
//! name-to-id resolution.

use chrono::{DateTime, Utc};
use impresario_core::{Blueprint, CanonFact, CanonRule, Conflict, Entity, Episode, Task, Teaser};
use impresario_error::ImpresarioResult;
use impresario_interface::{ShowCounts, ShowStore, TaskStore};
use serde_json::json;
use std::collections::HashSet;

/// How many canon facts the snapshot carries, newest first.
pub const RECENT_FACTS_LIMIT: i64 = 20;
/// How many teasers the snapshot carries, newest first.
pub const RECENT_TEASERS_LIMIT: i64 = 10;

/// Truncation ceiling for free text quoted in the summary.
const SUMMARY_TEXT_CHARS: usize = 160;

/// Read-only snapshot of show state for one cycle.
///
/// Derived coverage sets (which entities already have a blueprint or a
/// recent teaser) are computed once at assembly so every consumer of the
/// snapshot sees the same gaps.
#[derive(Debug, Clone)]
pub struct Blackboard {
    /// Per-table row counts.
    pub counts: ShowCounts,
    /// Full entity roster.
    pub entities: Vec<Entity>,
    /// Canon rules.
    pub rules: Vec<CanonRule>,
    /// Most recent canon facts, newest first.
    pub recent_facts: Vec<CanonFact>,
    /// Conflicts not yet resolved.
    pub open_conflicts: Vec<Conflict>,
    /// All blueprints.
    pub blueprints: Vec<Blueprint>,
    /// Most recent teasers, newest first.
    pub recent_teasers: Vec<Teaser>,
    /// Tasks still assigned or in progress at assembly time.
    pub pending_tasks: Vec<Task>,
    /// The most recently published episode, if any.
    pub latest_episode: Option<Episode>,
    /// Snapshot instant.
    pub assembled_at: DateTime<Utc>,
    blueprint_coverage: HashSet<i64>,
    teaser_coverage: HashSet<i64>,
}

impl Blackboard {
    /// Assemble a fresh snapshot from the live stores.
    ///
    /// # Errors
    ///
    /// Returns an error if any underlying store read fails.
    #[tracing::instrument(skip(show, tasks))]
    pub async fn assemble(
        show: &dyn ShowStore,
        tasks: &dyn TaskStore,
    ) -> ImpresarioResult<Self> {
        let counts = show.table_counts().await?;
        let entities = show.list_entities().await?;
        let rules = show.list_rules().await?;
        let recent_facts = show.list_facts(RECENT_FACTS_LIMIT).await?;
        let open_conflicts = show.list_open_conflicts().await?;
        let blueprints = show.list_blueprints().await?;
        let recent_teasers = show.list_recent_teasers(RECENT_TEASERS_LIMIT).await?;
        let latest_episode = show.latest_episode().await?;
        let pending_tasks = tasks.list_pending().await?;

        let blueprint_coverage = blueprints.iter().filter_map(|b| b.entity_id).collect();
        let teaser_coverage = recent_teasers.iter().filter_map(|t| t.entity_id).collect();

        tracing::debug!(
            entities = entities.len(),
            open_conflicts = open_conflicts.len(),
            pending_tasks = pending_tasks.len(),
            "Assembled blackboard"
        );

        Ok(Self {
            counts,
            entities,
            rules,
            recent_facts,
            open_conflicts,
            blueprints,
            recent_teasers,
            pending_tasks,
            latest_episode,
            assembled_at: Utc::now(),
            blueprint_coverage,
            teaser_coverage,
        })
    }

    /// An empty snapshot, useful when no show data exists yet.
    pub fn empty() -> Self {
        Self {
            counts: ShowCounts::default(),
            entities: Vec::new(),
            rules: Vec::new(),
            recent_facts: Vec::new(),
            open_conflicts: Vec::new(),
            blueprints: Vec::new(),
            recent_teasers: Vec::new(),
            pending_tasks: Vec::new(),
            latest_episode: None,
            assembled_at: Utc::now(),
            blueprint_coverage: HashSet::new(),
            teaser_coverage: HashSet::new(),
        }
    }

    /// Entities with no blueprint row pointing at them.
    pub fn entities_missing_blueprints(&self) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| !self.blueprint_coverage.contains(&e.id))
            .collect()
    }

    /// Entities with no teaser in the recent window.
    ///
    /// Coverage is judged against the snapshot's recent teasers, not the
    /// whole table: an entity last teased long ago counts as due again.
    pub fn entities_missing_teasers(&self) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| !self.teaser_coverage.contains(&e.id))
            .collect()
    }

    /// Minutes elapsed between the latest published episode and assembly.
    ///
    /// `None` when no episode has been published yet.
    pub fn minutes_since_last_episode(&self) -> Option<i64> {
        self.latest_episode
            .as_ref()
            .map(|e| (self.assembled_at - e.published_at).num_minutes())
    }

    /// JSON-shaped summary handed to the decision policy.
    ///
    /// Summaries only: names, titles, and truncated text, never raw rows.
    pub fn summary(&self) -> serde_json::Value {
        let entity_names: Vec<&str> = self.entities.iter().map(|e| e.name.as_str()).collect();
        let rules: Vec<&str> = self.rules.iter().map(|r| r.rule.as_str()).collect();
        let facts: Vec<String> = self
            .recent_facts
            .iter()
            .map(|f| truncate_chars(&f.fact, SUMMARY_TEXT_CHARS))
            .collect();
        let conflicts: Vec<serde_json::Value> = self
            .open_conflicts
            .iter()
            .map(|c| {
                json!({
                    "title": c.title,
                    "side_a": c.side_a,
                    "side_b": c.side_b,
                    "intensity": c.intensity,
                    "status": c.status,
                })
            })
            .collect();
        let blueprint_titles: Vec<&str> =
            self.blueprints.iter().map(|b| b.title.as_str()).collect();
        let teasers: Vec<String> = self
            .recent_teasers
            .iter()
            .map(|t| truncate_chars(&t.content, SUMMARY_TEXT_CHARS))
            .collect();
        let pending: Vec<serde_json::Value> = self
            .pending_tasks
            .iter()
            .map(|t| json!({ "worker": t.worker, "task_type": t.task_type }))
            .collect();
        let missing_blueprints: Vec<&str> = self
            .entities_missing_blueprints()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        let missing_teasers: Vec<&str> = self
            .entities_missing_teasers()
            .iter()
            .map(|e| e.name.as_str())
            .collect();

        json!({
            "counts": {
                "entities": self.counts.entities,
                "canon_facts": self.counts.canon_facts,
                "canon_rules": self.counts.canon_rules,
                "conflicts": self.counts.conflicts,
                "blueprints": self.counts.blueprints,
                "teasers": self.counts.teasers,
                "scripts": self.counts.scripts,
                "episodes": self.counts.episodes,
            },
            "entities": entity_names,
            "canon_rules": rules,
            "recent_facts": facts,
            "open_conflicts": conflicts,
            "blueprint_titles": blueprint_titles,
            "recent_teasers": teasers,
            "pending_tasks": pending,
            "gaps": {
                "entities_missing_blueprints": missing_blueprints,
                "entities_missing_teasers": missing_teasers,
            },
            "minutes_since_last_episode": self.minutes_since_last_episode(),
        })
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
