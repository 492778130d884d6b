//! Task lifecycle types.
//!
//! A task is a unit of work assigned to one worker by the decision engine.
//! Tasks are persisted before execution and never deleted, so the task table
//! doubles as an execution history.

use crate::Destination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// Transitions move forward only: `Assigned` to `InProgress` to either
/// `Completed` or `Rejected`. Re-marking an `InProgress` task `InProgress`
/// is allowed so a restarted run can reclaim work it had already started.
///
/// # Examples
///
/// ```
/// use impresario_core::TaskStatus;
///
/// assert!(TaskStatus::Assigned.can_transition_to(TaskStatus::InProgress));
/// assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::InProgress));
/// assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
/// assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created by the decision engine, not yet started
    #[display("assigned")]
    Assigned,
    /// Handed to a worker; the external call may be in flight
    #[display("in_progress")]
    InProgress,
    /// Worker output was routed; terminal
    #[display("completed")]
    Completed,
    /// Execution failed or was refused; terminal
    #[display("rejected")]
    Rejected,
}

impl TaskStatus {
    /// String representation used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Rejected => "rejected",
        }
    }

    /// Whether this status ends the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Rejected)
    }

    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Assigned => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Completed | TaskStatus::Rejected => 2,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        if *self == TaskStatus::InProgress && next == TaskStatus::InProgress {
            return true;
        }
        next.rank() > self.rank()
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(TaskStatus::Assigned),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "rejected" => Ok(TaskStatus::Rejected),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Where a completed task's output landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRef {
    /// Destination table the output was routed to
    pub destination: Destination,
    /// Row id of the primary record written, if any write succeeded
    pub record_id: Option<i64>,
}

impl OutputRef {
    /// Output routed to a known destination with an optional record id.
    pub fn new(destination: Destination, record_id: Option<i64>) -> Self {
        Self {
            destination,
            record_id,
        }
    }

    /// Output whose shape matched nothing; recorded, not discarded.
    pub fn unknown() -> Self {
        Self {
            destination: Destination::Unknown,
            record_id: None,
        }
    }
}

/// An unpersisted task proposal parsed from decision-engine output.
///
/// Field names are lenient because the upstream policy's phrasing varies:
/// `description` also accepts `instruction`, and `input_refs` accepts
/// `inputs` or `references`.
///
/// # Examples
///
/// ```
/// use impresario_core::TaskDraft;
///
/// let draft: TaskDraft = serde_json::from_str(
///     r#"{"worker": "lore", "task_type": "create_entity",
///         "instruction": "Invent a rival studio"}"#,
/// ).unwrap();
/// assert_eq!(draft.description, "Invent a rival studio");
/// assert_eq!(draft.priority, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Name of the worker this task is addressed to
    pub worker: String,
    /// Free-text task type; canonicalized later by the router
    pub task_type: String,
    /// What the worker should do
    #[serde(alias = "instruction")]
    pub description: String,
    /// Advisory ordering hint, 1 (highest) through 10
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Opaque references the context builder may resolve (entity names etc.)
    #[serde(default = "default_input_refs", alias = "inputs", alias = "references")]
    pub input_refs: serde_json::Value,
}

fn default_priority() -> i32 {
    5
}

fn default_input_refs() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl TaskDraft {
    /// Create a draft with default priority and empty input refs.
    pub fn new(
        worker: impl Into<String>,
        task_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            worker: worker.into(),
            task_type: task_type.into(),
            description: description.into(),
            priority: default_priority(),
            input_refs: default_input_refs(),
        }
    }

    /// Set input references.
    pub fn with_input_refs(mut self, input_refs: serde_json::Value) -> Self {
        self.input_refs = input_refs;
        self
    }

    /// Set the priority hint.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A persisted unit of work.
///
/// # Examples
///
/// ```
/// use impresario_core::{Task, TaskDraft, TaskStatus};
///
/// let task = Task::from_draft(
///     TaskDraft::new("design", "design_blueprint", "Blueprint for the diva"),
///     "worker-design",
/// );
/// assert_eq!(task.status, TaskStatus::Assigned);
/// assert!(task.output.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Name of the assigned worker
    pub worker: String,
    /// Identity of the assigned worker
    pub worker_id: String,
    /// Free-text task type from the decision engine
    pub task_type: String,
    /// What the worker should do
    pub description: String,
    /// Advisory ordering hint
    pub priority: i32,
    /// Opaque references carried from the draft
    pub input_refs: serde_json::Value,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Set once on completion
    pub output: Option<OutputRef>,
    /// Set once on rejection; the failure's display string verbatim
    pub rejection_reason: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last status-change timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Materialize a draft into an `Assigned` task with a fresh id.
    pub fn from_draft(draft: TaskDraft, worker_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            worker: draft.worker,
            worker_id: worker_id.into(),
            task_type: draft.task_type,
            description: draft.description,
            priority: draft.priority,
            input_refs: draft.input_refs,
            status: TaskStatus::Assigned,
            output: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this task still needs execution.
    pub fn is_pending(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_status_transitions_forward_only() {
        assert!(TaskStatus::Assigned.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::Assigned.can_transition_to(TaskStatus::Rejected));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Rejected));

        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Assigned));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Rejected));
        assert!(!TaskStatus::Rejected.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
    }

    #[test]
    fn test_in_progress_reentry_allowed() {
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::Assigned.can_transition_to(TaskStatus::Assigned));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in TaskStatus::iter() {
            let parsed: TaskStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
            assert_eq!(format!("{}", status), status.as_str());
        }
    }

    #[test]
    fn test_draft_accepts_instruction_alias() {
        let draft: TaskDraft = serde_json::from_str(
            r#"{"worker": "drama", "task_type": "write_teaser",
                "instruction": "Tease the feud", "priority": 2}"#,
        )
        .unwrap();
        assert_eq!(draft.description, "Tease the feud");
        assert_eq!(draft.priority, 2);
        assert!(draft.input_refs.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_draft_accepts_references_alias() {
        let draft: TaskDraft = serde_json::from_str(
            r#"{"worker": "script", "task_type": "write_script",
                "description": "Script the premiere",
                "references": {"entity": "Velvet Mirage"}}"#,
        )
        .unwrap();
        assert_eq!(draft.input_refs["entity"], "Velvet Mirage");
    }

    #[test]
    fn test_from_draft_assigns_identity_and_defaults() {
        let task = Task::from_draft(
            TaskDraft::new("lore", "record_fact", "Note the studio's founding year"),
            "worker-lore",
        );
        assert_eq!(task.worker, "lore");
        assert_eq!(task.worker_id, "worker-lore");
        assert_eq!(task.priority, 5);
        assert!(task.is_pending());
        assert!(!task.id.is_empty());
        assert_eq!(task.created_at, task.updated_at);
    }
}
