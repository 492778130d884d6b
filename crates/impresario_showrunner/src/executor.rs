//! Executes one task against a worker's generation policy.

use crate::extraction::extract_json_value;
use crate::playbook::{Playbook, PlaybookLibrary};
use impresario_core::{Heartbeat, Task, Worker, WorkerStatus};
use impresario_error::{ImpresarioResult, PolicyError, PolicyErrorKind, RegistryErrorKind};
use impresario_interface::{CompletionDriver, CompletionRequest, CycleObserver, TaskStore};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Runs a worker's policy for a single task.
///
/// Policy-level failures (driver errors, timeouts, replies with no JSON)
/// are terminal for the task but not for the cycle: the task is rejected
/// with the failure's display string as reason and `Ok(None)` is
/// returned. Only store failures propagate.
pub struct WorkerExecutor<D> {
    driver: Arc<D>,
    tasks: Arc<dyn TaskStore>,
    playbooks: PlaybookLibrary,
    observer: Arc<dyn CycleObserver>,
    timeout: Duration,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl<D: CompletionDriver> WorkerExecutor<D> {
    /// Create an executor with the default driver timeout.
    pub fn new(
        driver: Arc<D>,
        tasks: Arc<dyn TaskStore>,
        playbooks: PlaybookLibrary,
        observer: Arc<dyn CycleObserver>,
    ) -> Self {
        Self {
            driver,
            tasks,
            playbooks,
            observer,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: None,
            max_tokens: None,
        }
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

    /// Execute the task and return the worker's raw JSON output.
    ///
    /// The task is flipped to in-progress before the policy call. On
    /// success the raw value is returned for routing and the worker's
    /// heartbeat reads idle; the task itself stays in-progress until the
    /// router has placed the output.
    ///
    /// # Errors
    ///
    /// Returns an error only when the task store itself fails.
    #[tracing::instrument(skip(self, task, worker, context), fields(task_id = %task.id, worker = worker.name(), task_type = %task.task_type))]
    pub async fn execute(
        &self,
        task: &Task,
        worker: &Worker,
        context: serde_json::Value,
    ) -> ImpresarioResult<Option<serde_json::Value>> {
        let previous = task.status;
        let task = self.tasks.mark_in_progress(&task.id).await?;
        self.observer.on_task_state_change(&task, previous).await;
        self.heartbeat(worker, WorkerStatus::Working, Some(task.description.clone()))
            .await;

        let Some(playbook) = self.playbooks.get(worker.role()) else {
            let reason =
                RegistryErrorKind::MissingPlaybook(worker.role().to_string()).to_string();
            return self.reject(&task, worker, reason).await;
        };

        let request = self.build_request(playbook, &task, &context);
        let outcome = match tokio::time::timeout(self.timeout, self.driver.complete(&request))
            .await
        {
            Err(_) => Err(
                PolicyError::new(PolicyErrorKind::Timeout(self.timeout.as_secs())).to_string(),
            ),
            Ok(Err(e)) => Err(e.to_string()),
            Ok(Ok(response)) => extract_json_value(&response.text).map_err(|e| e.to_string()),
        };

        match outcome {
            Ok(raw) => {
                self.heartbeat(worker, WorkerStatus::Idle, None).await;
                Ok(Some(raw))
            }
            Err(reason) => self.reject(&task, worker, reason).await,
        }
    }

    fn build_request(
        &self,
        playbook: &Playbook,
        task: &Task,
        context: &serde_json::Value,
    ) -> CompletionRequest {
        let prompt = format!(
            "{}\n\nYour task: {}\n\nContext:\n{context:#}",
            playbook.instructions, task.description
        );
        let mut request = CompletionRequest::new(prompt).with_system(playbook.system.clone());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }

    /// Reject the task with the failure's display string and settle the
    /// worker's heartbeat on error.
    async fn reject(
        &self,
        task: &Task,
        worker: &Worker,
        reason: String,
    ) -> ImpresarioResult<Option<serde_json::Value>> {
        tracing::warn!(task_id = %task.id, reason = %reason, "Rejecting task");
        let previous = task.status;
        let rejected = self.tasks.mark_rejected(&task.id, &reason).await?;
        self.observer.on_task_state_change(&rejected, previous).await;
        self.heartbeat(worker, WorkerStatus::Error, Some(reason)).await;
        Ok(None)
    }

    async fn heartbeat(&self, worker: &Worker, status: WorkerStatus, detail: Option<String>) {
        let heartbeat = Heartbeat::now(worker.id(), worker.name(), status, detail);
        self.observer.on_worker_heartbeat(&heartbeat).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impresario_core::{TaskDraft, TaskStatus, WorkerRole};
    use impresario_interface::{StoreObserver, TelemetryStore};
    use impresario_models::ScriptedDriver;
    use impresario_storage::MemoryStore;
    use serde_json::json;

    struct Rig {
        store: Arc<MemoryStore>,
        driver: Arc<ScriptedDriver>,
        executor: WorkerExecutor<ScriptedDriver>,
        worker: Worker,
    }

    fn rig(replies: Vec<&str>) -> Rig {
        let store = Arc::new(MemoryStore::new());
        let driver = Arc::new(ScriptedDriver::new(replies));
        let observer = Arc::new(StoreObserver::new(
            store.clone() as Arc<dyn TelemetryStore>
        ));
        let executor = WorkerExecutor::new(
            driver.clone(),
            store.clone() as Arc<dyn TaskStore>,
            PlaybookLibrary::builtin(),
            observer,
        );
        let worker = Worker::builder()
            .id("worker-lore")
            .name("lore")
            .role(WorkerRole::Lore)
            .build()
            .unwrap();
        Rig {
            store,
            driver,
            executor,
            worker,
        }
    }

    async fn one_task(store: &MemoryStore) -> Task {
        let draft = TaskDraft::new("lore", "create_entity", "Invent a rival captain");
        let mut created = store
            .create_batch(vec![Task::from_draft(draft, "worker-lore")])
            .await
            .unwrap();
        created.remove(0)
    }

    #[tokio::test]
    async fn test_execute_returns_raw_output_and_leaves_task_in_progress() {
        let rig = rig(vec![r#"{"name": "Mara Sloane", "description": "A rival captain"}"#]);
        let task = one_task(&rig.store).await;

        let output = rig
            .executor
            .execute(&task, &rig.worker, json!({}))
            .await
            .unwrap();

        assert_eq!(output.unwrap()["name"], "Mara Sloane");
        let stored = rig.store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_driver_failure_rejects_with_verbatim_reason() {
        let rig = rig(Vec::new());
        rig.driver.push_failure("model fell over");
        let task = one_task(&rig.store).await;

        let output = rig
            .executor
            .execute(&task, &rig.worker, json!({}))
            .await
            .unwrap();

        assert!(output.is_none());
        let stored = rig.store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Rejected);
        assert!(
            stored
                .rejection_reason
                .as_deref()
                .unwrap()
                .contains("model fell over")
        );
    }

    #[tokio::test]
    async fn test_reply_without_json_rejects_task() {
        let rig = rig(vec!["I would rather discuss the weather."]);
        let task = one_task(&rig.store).await;

        let output = rig
            .executor
            .execute(&task, &rig.worker, json!({}))
            .await
            .unwrap();

        assert!(output.is_none());
        let stored = rig.store.get_task(&task.id).await.unwrap().unwrap();
        assert!(
            stored
                .rejection_reason
                .as_deref()
                .unwrap()
                .contains("No JSON")
        );
    }

    #[tokio::test]
    async fn test_missing_playbook_rejects_task() {
        let store = Arc::new(MemoryStore::new());
        let driver = Arc::new(ScriptedDriver::new(vec![r#"{"unused": true}"#]));
        let observer = Arc::new(StoreObserver::new(
            store.clone() as Arc<dyn TelemetryStore>
        ));
        let executor = WorkerExecutor::new(
            driver,
            store.clone() as Arc<dyn TaskStore>,
            PlaybookLibrary::new(),
            observer,
        );
        let worker = Worker::builder()
            .id("worker-lore")
            .name("lore")
            .role(WorkerRole::Lore)
            .build()
            .unwrap();
        let task = one_task(&store).await;

        let output = executor.execute(&task, &worker, json!({})).await.unwrap();

        assert!(output.is_none());
        let stored = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Rejected);
        assert!(
            stored
                .rejection_reason
                .as_deref()
                .unwrap()
                .contains("No playbook for role: lore")
        );
    }

    #[tokio::test]
    async fn test_heartbeats_settle_on_idle_after_success() {
        let rig = rig(vec![r#"{"fact": "The station is sinking"}"#]);
        let task = one_task(&rig.store).await;

        rig.executor
            .execute(&task, &rig.worker, json!({}))
            .await
            .unwrap();

        let beats = rig.store.list_heartbeats().await.unwrap();
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].worker_id, "worker-lore");
        assert_eq!(beats[0].status, WorkerStatus::Idle);
    }

    #[tokio::test]
    async fn test_heartbeats_settle_on_error_after_failure() {
        let rig = rig(Vec::new());
        rig.driver.push_failure("boom");
        let task = one_task(&rig.store).await;

        rig.executor
            .execute(&task, &rig.worker, json!({}))
            .await
            .unwrap();

        let beats = rig.store.list_heartbeats().await.unwrap();
        assert_eq!(beats[0].status, WorkerStatus::Error);
        assert!(beats[0].detail.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_prompt_carries_playbook_task_and_context() {
        let rig = rig(vec![r#"{"ok": true}"#]);
        let task = one_task(&rig.store).await;

        rig.executor
            .execute(&task, &rig.worker, json!({"entities": ["Vex"]}))
            .await
            .unwrap();

        let requests = rig.driver.requests();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("Invent a rival captain"));
        assert!(prompt.contains("Vex"));
        assert!(requests[0].system.as_deref().unwrap().contains("lore keeper"));
    }
}
