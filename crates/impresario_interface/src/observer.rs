//! Cycle observer: telemetry out of the control flow.
//!
//! Heartbeats and audit rows are side effects of execution, not part of
//! it. The executor and the forge report through this trait rather than
//! writing telemetry inline, so the business path stays free of
//! cross-cutting writes and tests can observe state changes directly.

use crate::TelemetryStore;
use async_trait::async_trait;
use impresario_core::{AuditEntry, Heartbeat, Task, TaskStatus};
use std::sync::Arc;

/// Receives lifecycle events from the engine and the forge.
///
/// Observer failures must never fail the observed operation;
/// implementations swallow and log their own errors.
#[async_trait]
pub trait CycleObserver: Send + Sync {
    /// A task moved between lifecycle states.
    async fn on_task_state_change(&self, task: &Task, previous: TaskStatus);

    /// A worker's observable state changed.
    async fn on_worker_heartbeat(&self, heartbeat: &Heartbeat);

    /// The safety gate ruled on a forge action.
    async fn on_safety_decision(&self, entry: &AuditEntry);
}

/// Observer that only emits tracing events.
///
/// The default for tests and database-less runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

#[async_trait]
impl CycleObserver for LogObserver {
    async fn on_task_state_change(&self, task: &Task, previous: TaskStatus) {
        tracing::info!(
            task_id = %task.id,
            worker = %task.worker,
            from = %previous,
            to = %task.status,
            "Task state changed"
        );
    }

    async fn on_worker_heartbeat(&self, heartbeat: &Heartbeat) {
        tracing::debug!(
            worker_id = %heartbeat.worker_id,
            status = %heartbeat.status,
            detail = ?heartbeat.detail,
            "Worker heartbeat"
        );
    }

    async fn on_safety_decision(&self, entry: &AuditEntry) {
        if entry.allowed {
            tracing::info!(
                category = %entry.category,
                action = %entry.action,
                "Forge action permitted"
            );
        } else {
            tracing::warn!(
                category = %entry.category,
                action = %entry.action,
                reason = ?entry.reason,
                "Forge action denied"
            );
        }
    }
}

/// Observer that persists heartbeats and audit entries through a
/// [`TelemetryStore`], logging as it goes.
pub struct StoreObserver {
    telemetry: Arc<dyn TelemetryStore>,
}

impl StoreObserver {
    /// Wrap a telemetry store.
    pub fn new(telemetry: Arc<dyn TelemetryStore>) -> Self {
        Self { telemetry }
    }
}

#[async_trait]
impl CycleObserver for StoreObserver {
    async fn on_task_state_change(&self, task: &Task, previous: TaskStatus) {
        // Task rows already carry their status; nothing extra to persist.
        LogObserver.on_task_state_change(task, previous).await;
    }

    async fn on_worker_heartbeat(&self, heartbeat: &Heartbeat) {
        LogObserver.on_worker_heartbeat(heartbeat).await;
        if let Err(e) = self.telemetry.upsert_heartbeat(heartbeat.clone()).await {
            tracing::warn!(
                worker_id = %heartbeat.worker_id,
                error = %e,
                "Failed to persist heartbeat"
            );
        }
    }

    async fn on_safety_decision(&self, entry: &AuditEntry) {
        LogObserver.on_safety_decision(entry).await;
        if let Err(e) = self.telemetry.append_audit(entry.clone()).await {
            tracing::warn!(
                category = %entry.category,
                error = %e,
                "Failed to persist audit entry"
            );
        }
    }
}
