//! The cycle controller: drain, decide, execute, report.

use crate::blackboard::Blackboard;
use crate::context::ContextBuilder;
use crate::decision::DecisionEngine;
use crate::executor::WorkerExecutor;
use crate::playbook::PlaybookLibrary;
use crate::router::OutputRouter;
use crate::troupe::TroupeRegistry;
use derive_builder::Builder;
use derive_getters::Getters;
use impresario_core::{Task, TaskStatus};
use impresario_error::{ImpresarioResult, RegistryErrorKind};
use impresario_interface::{CompletionDriver, CycleObserver, ShowStore, TaskStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn default_max_tasks() -> usize {
    3
}

fn default_decision_timeout() -> u64 {
    120
}

fn default_worker_timeout() -> u64 {
    120
}

/// Tuning knobs for the cycle engine.
#[derive(Debug, Clone, PartialEq, Builder, Getters, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct ShowrunnerConfig {
    /// Cap on new tasks decided per cycle.
    #[builder(default = "default_max_tasks()")]
    #[serde(default = "default_max_tasks")]
    max_tasks_per_cycle: usize,
    /// Ceiling on the decision call, in seconds.
    #[builder(default = "default_decision_timeout()")]
    #[serde(default = "default_decision_timeout")]
    decision_timeout_secs: u64,
    /// Ceiling on each worker call, in seconds.
    #[builder(default = "default_worker_timeout()")]
    #[serde(default = "default_worker_timeout")]
    worker_timeout_secs: u64,
    /// Sampling temperature forwarded to the driver.
    #[builder(default)]
    #[serde(default)]
    temperature: Option<f32>,
    /// Token ceiling forwarded to the driver.
    #[builder(default)]
    #[serde(default)]
    max_tokens: Option<u32>,
}

impl ShowrunnerConfig {
    /// Start building a config.
    pub fn builder() -> ShowrunnerConfigBuilder {
        ShowrunnerConfigBuilder::default()
    }
}

impl Default for ShowrunnerConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_cycle: default_max_tasks(),
            decision_timeout_secs: default_decision_timeout(),
            worker_timeout_secs: default_worker_timeout(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Carried-over tasks executed before deciding.
    pub drained: usize,
    /// True when pending work remained after the drain and the decision
    /// step was skipped.
    pub early_stop: bool,
    /// Drafts the decision step produced after batch rules.
    pub decided: usize,
    /// Tasks executed this cycle, drained and new.
    pub executed: usize,
    /// Tasks that reached completed.
    pub completed: usize,
    /// Tasks that reached rejected.
    pub rejected: usize,
    /// Wall-clock cycle duration.
    pub duration: Duration,
}

/// Runs the show, one cycle at a time.
///
/// A cycle assembles the blackboard, drains any work carried over from
/// earlier cycles, decides a bounded batch of new tasks, and executes
/// them strictly in order. Task-level failures are terminal for the task
/// only; a cycle-level error means a store gave out.
pub struct Showrunner<D> {
    tasks: Arc<dyn TaskStore>,
    show: Arc<dyn ShowStore>,
    troupe: Arc<TroupeRegistry>,
    decision: DecisionEngine<D>,
    context: ContextBuilder,
    executor: WorkerExecutor<D>,
    router: OutputRouter,
    observer: Arc<dyn CycleObserver>,
}

impl<D: CompletionDriver> Showrunner<D> {
    /// Wire up the engine.
    pub fn new(
        driver: Arc<D>,
        tasks: Arc<dyn TaskStore>,
        show: Arc<dyn ShowStore>,
        troupe: Arc<TroupeRegistry>,
        playbooks: PlaybookLibrary,
        observer: Arc<dyn CycleObserver>,
        config: ShowrunnerConfig,
    ) -> Self {
        let decision = DecisionEngine::new(driver.clone(), troupe.clone())
            .with_max_tasks(*config.max_tasks_per_cycle())
            .with_timeout(Duration::from_secs(*config.decision_timeout_secs()))
            .with_sampling(*config.temperature(), *config.max_tokens());
        let executor = WorkerExecutor::new(driver, tasks.clone(), playbooks, observer.clone())
            .with_timeout(Duration::from_secs(*config.worker_timeout_secs()))
            .with_sampling(*config.temperature(), *config.max_tokens());
        let context = ContextBuilder::new(show.clone());
        let router = OutputRouter::new(show.clone());

        Self {
            tasks,
            show,
            troupe,
            decision,
            context,
            executor,
            router,
            observer,
        }
    }

    /// Run one full cycle.
    ///
    /// # Errors
    ///
    /// Returns an error only when a store operation fails; every other
    /// failure is absorbed as a task rejection or an empty decision.
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self) -> ImpresarioResult<CycleOutcome> {
        let started = Instant::now();
        let board = Blackboard::assemble(self.show.as_ref(), self.tasks.as_ref()).await?;

        let mut completed = 0usize;
        let mut rejected = 0usize;

        // Carried-over work runs before anything new is decided, so a
        // restart never silently abandons a task.
        let drained = board.pending_tasks.len();
        if drained > 0 {
            tracing::info!(count = drained, "Draining carried-over tasks");
        }
        for task in &board.pending_tasks {
            if self.run_task(task, &board).await? {
                completed += 1;
            } else {
                rejected += 1;
            }
        }

        let leftover = self.tasks.list_pending().await?;
        if !leftover.is_empty() {
            tracing::warn!(
                pending = leftover.len(),
                "Pending tasks remain after drain, skipping the decision step"
            );
            let outcome = CycleOutcome {
                drained,
                early_stop: true,
                decided: 0,
                executed: drained,
                completed,
                rejected,
                duration: started.elapsed(),
            };
            self.log_outcome(&outcome);
            return Ok(outcome);
        }

        let drafts = self.decision.decide(&board).await;
        let decided = drafts.len();

        let mut new_tasks = Vec::with_capacity(decided);
        for draft in drafts {
            let worker_id = match self.troupe.resolve(&draft.worker) {
                Some(worker) => worker.id().clone(),
                None => "unassigned".to_string(),
            };
            new_tasks.push(Task::from_draft(draft, worker_id));
        }
        let created = self.tasks.create_batch(new_tasks).await?;

        for task in &created {
            if self.run_task(task, &board).await? {
                completed += 1;
            } else {
                rejected += 1;
            }
        }

        let outcome = CycleOutcome {
            drained,
            early_stop: false,
            decided,
            executed: drained + created.len(),
            completed,
            rejected,
            duration: started.elapsed(),
        };
        self.log_outcome(&outcome);
        Ok(outcome)
    }

    /// Execute one task end to end. Returns whether it completed.
    async fn run_task(&self, task: &Task, board: &Blackboard) -> ImpresarioResult<bool> {
        let Some(worker) = self.troupe.resolve(&task.worker) else {
            let reason = RegistryErrorKind::UnknownWorker(task.worker.clone()).to_string();
            tracing::warn!(task_id = %task.id, worker = %task.worker, "Rejecting task for unknown worker");
            let previous = task.status;
            let rejected = self.tasks.mark_rejected(&task.id, &reason).await?;
            self.observer.on_task_state_change(&rejected, previous).await;
            return Ok(false);
        };

        let context = self.context.build(task, *worker.role(), board).await;
        let Some(raw) = self.executor.execute(task, worker, context).await? else {
            return Ok(false);
        };

        let output = self.router.route(task, &raw).await;
        let completed = self.tasks.mark_completed(&task.id, output).await?;
        self.observer
            .on_task_state_change(&completed, TaskStatus::InProgress)
            .await;
        Ok(true)
    }

    fn log_outcome(&self, outcome: &CycleOutcome) {
        tracing::info!(
            drained = outcome.drained,
            early_stop = outcome.early_stop,
            decided = outcome.decided,
            completed = outcome.completed,
            rejected = outcome.rejected,
            duration_ms = outcome.duration.as_millis() as u64,
            "Cycle finished"
        );
    }
}
