//! The decision step: snapshot in, bounded task list out.

use crate::blackboard::Blackboard;
use crate::extraction::extract_json_value;
use crate::troupe::TroupeRegistry;
use impresario_core::TaskDraft;
use impresario_interface::{CompletionDriver, CompletionRequest};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_TASKS: usize = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const DECISION_SYSTEM_PROMPT: &str = "You are the showrunner of an autonomous serialized \
show. Each cycle you study the state of the show and assign the next round of work to \
your troupe. You favor filling gaps: entities without blueprints or teasers, stale \
conflicts, and overdue episodes.";

/// Produces the next batch of task drafts from a snapshot.
///
/// The policy behind the decision is a pluggable completion driver; its
/// freeform reply is parsed leniently. Every failure mode (driver error,
/// timeout, unparseable reply) degrades to an empty batch rather than an
/// error: a cycle with nothing to do is a valid outcome.
pub struct DecisionEngine<D> {
    driver: Arc<D>,
    troupe: Arc<TroupeRegistry>,
    max_tasks: usize,
    timeout: Duration,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl<D: CompletionDriver> DecisionEngine<D> {
    /// Create a decision engine with default cap and timeout.
    pub fn new(driver: Arc<D>, troupe: Arc<TroupeRegistry>) -> Self {
        Self {
            driver,
            troupe,
            max_tasks: DEFAULT_MAX_TASKS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the per-batch task cap.
    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    /// Set the driver call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set sampling parameters forwarded to the driver.
    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Decide the next batch of tasks for the troupe.
    ///
    /// Returns between zero and the configured cap of drafts. Never fails:
    /// malformed policy output, driver errors, and timeouts all produce an
    /// empty batch with a warning.
    #[tracing::instrument(skip(self, board), fields(provider = self.driver.provider_name()))]
    pub async fn decide(&self, board: &Blackboard) -> Vec<TaskDraft> {
        let request = self.build_request(board);

        let response = match tokio::time::timeout(self.timeout, self.driver.complete(&request))
            .await
        {
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Decision call timed out, deciding nothing this cycle"
                );
                return Vec::new();
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Decision call failed, deciding nothing this cycle");
                return Vec::new();
            }
            Ok(Ok(response)) => response,
        };

        let value = match extract_json_value(&response.text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Decision reply held no JSON, deciding nothing this cycle");
                return Vec::new();
            }
        };

        let drafts = parse_drafts(value);
        self.enforce_batch_rules(drafts)
    }

    fn build_request(&self, board: &Blackboard) -> CompletionRequest {
        let summary = board.summary();
        let prompt = format!(
            "Troupe roster:\n{}\n\nShow state:\n{:#}\n\n\
             Assign the next tasks. Reply with a JSON array of zero to {} objects, \
             each shaped {{\"worker\": <roster name>, \"task_type\": <a permitted type>, \
             \"description\": <one concrete instruction>, \"priority\": 1-10, \
             \"input_refs\": {{...names or ids the worker needs...}}}}. \
             At most one task per worker. Reply with [] when nothing is worth doing.",
            self.troupe.roster_summary(),
            summary,
            self.max_tasks,
        );

        let mut request = CompletionRequest::new(prompt).with_system(DECISION_SYSTEM_PROMPT);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }

    /// One draft per worker (first wins), then truncate to the cap.
    fn enforce_batch_rules(&self, drafts: Vec<TaskDraft>) -> Vec<TaskDraft> {
        let mut seen_workers: HashSet<String> = HashSet::new();
        let mut batch: Vec<TaskDraft> = Vec::new();

        for draft in drafts {
            if !seen_workers.insert(draft.worker.clone()) {
                tracing::warn!(
                    worker = %draft.worker,
                    task_type = %draft.task_type,
                    "Dropping extra draft for worker already tasked this batch"
                );
                continue;
            }
            batch.push(draft);
        }

        if batch.len() > self.max_tasks {
            tracing::warn!(
                decided = batch.len(),
                cap = self.max_tasks,
                "Truncating decision batch to cap"
            );
            batch.truncate(self.max_tasks);
        }

        batch
    }
}

/// Pull task drafts out of whatever JSON shape the policy replied with.
///
/// Accepts a bare array, a `{"tasks": [...]}` wrapper, or a single draft
/// object. Items that do not parse as drafts are skipped with a warning.
fn parse_drafts(value: serde_json::Value) -> Vec<TaskDraft> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<TaskDraft>(item) {
                Ok(draft) => Some(draft),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed task draft");
                    None
                }
            })
            .collect(),
        serde_json::Value::Object(ref map) if map.contains_key("tasks") => {
            match value.get("tasks").cloned() {
                Some(tasks @ serde_json::Value::Array(_)) => parse_drafts(tasks),
                _ => {
                    tracing::warn!("Decision reply's 'tasks' field is not an array");
                    Vec::new()
                }
            }
        }
        object @ serde_json::Value::Object(_) => {
            match serde_json::from_value::<TaskDraft>(object) {
                Ok(draft) => vec![draft],
                Err(e) => {
                    tracing::warn!(error = %e, "Decision reply was not a task draft");
                    Vec::new()
                }
            }
        }
        other => {
            tracing::warn!(kind = %json_kind(&other), "Decision reply was not tasks");
            Vec::new()
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impresario_models::ScriptedDriver;

    fn engine_with(replies: Vec<&str>) -> DecisionEngine<ScriptedDriver> {
        DecisionEngine::new(
            Arc::new(ScriptedDriver::new(replies)),
            Arc::new(TroupeRegistry::default_troupe()),
        )
    }

    #[tokio::test]
    async fn test_decide_parses_array_of_drafts() {
        let engine = engine_with(vec![
            r#"Here is the plan:
[
  {"worker": "lore", "task_type": "create_entity", "description": "Invent a rival captain", "priority": 7},
  {"worker": "design", "task_type": "design_blueprint", "description": "Blueprint for The Broker", "input_refs": {"entity_name": "The Broker"}}
]"#,
        ]);

        let drafts = engine.decide(&Blackboard::empty()).await;
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].worker, "lore");
        assert_eq!(drafts[0].priority, 7);
        assert_eq!(drafts[1].input_refs["entity_name"], "The Broker");
    }

    #[tokio::test]
    async fn test_decide_unparseable_reply_is_empty_batch() {
        let engine = engine_with(vec!["I think the show needs more tension overall."]);
        let drafts = engine.decide(&Blackboard::empty()).await;
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn test_decide_driver_failure_is_empty_batch() {
        let driver = ScriptedDriver::new(Vec::<String>::new());
        driver.push_failure("model fell over");
        let engine = DecisionEngine::new(
            Arc::new(driver),
            Arc::new(TroupeRegistry::default_troupe()),
        );

        let drafts = engine.decide(&Blackboard::empty()).await;
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn test_decide_truncates_to_cap() {
        let engine = engine_with(vec![
            r#"[
  {"worker": "lore", "task_type": "record_fact", "description": "a"},
  {"worker": "design", "task_type": "design_blueprint", "description": "b"},
  {"worker": "script", "task_type": "write_script", "description": "c"},
  {"worker": "drama", "task_type": "write_teaser", "description": "d"}
]"#,
        ]);

        let drafts = engine.decide(&Blackboard::empty()).await;
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[2].worker, "script");
    }

    #[tokio::test]
    async fn test_decide_keeps_first_draft_per_worker() {
        let engine = engine_with(vec![
            r#"[
  {"worker": "drama", "task_type": "create_conflict", "description": "first"},
  {"worker": "drama", "task_type": "write_teaser", "description": "second"}
]"#,
        ]);

        let drafts = engine.decide(&Blackboard::empty()).await;
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].description, "first");
    }

    #[tokio::test]
    async fn test_decide_accepts_tasks_wrapper_object() {
        let engine = engine_with(vec![
            r#"{"tasks": [{"worker": "lore", "task_type": "record_fact", "description": "note the ledger"}]}"#,
        ]);

        let drafts = engine.decide(&Blackboard::empty()).await;
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].task_type, "record_fact");
    }

    #[tokio::test]
    async fn test_decide_accepts_single_draft_object() {
        let engine = engine_with(vec![
            r#"{"worker": "script", "task_type": "write_script", "description": "pilot episode"}"#,
        ]);

        let drafts = engine.decide(&Blackboard::empty()).await;
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].worker, "script");
    }

    #[tokio::test]
    async fn test_decide_skips_malformed_items() {
        let engine = engine_with(vec![
            r#"[
  {"worker": "lore", "task_type": "record_fact", "description": "good"},
  {"bogus": true},
  {"worker": "drama", "task_type": "write_teaser", "description": "also good"}
]"#,
        ]);

        let drafts = engine.decide(&Blackboard::empty()).await;
        assert_eq!(drafts.len(), 2);
    }

    #[test]
    fn test_enforce_batch_rules_order_is_preserved() {
        let engine = engine_with(Vec::new()).with_max_tasks(2);
        let drafts = vec![
            TaskDraft::new("lore", "record_fact", "a"),
            TaskDraft::new("drama", "write_teaser", "b"),
            TaskDraft::new("script", "write_script", "c"),
        ];
        let batch = engine.enforce_batch_rules(drafts);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].worker, "lore");
        assert_eq!(batch[1].worker, "drama");
    }
}
