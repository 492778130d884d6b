//! Worker heartbeat types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observable state of a worker.
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
pub enum WorkerStatus {
    /// A task is executing on this worker's behalf
    #[display("working")]
    Working,
    /// No task in flight
    #[display("idle")]
    Idle,
    /// The last task failed; detail carries the reason
    #[display("error")]
    Error,
}

impl WorkerStatus {
    /// String representation used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Working => "working",
            WorkerStatus::Idle => "idle",
            WorkerStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for WorkerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(WorkerStatus::Working),
            "idle" => Ok(WorkerStatus::Idle),
            "error" => Ok(WorkerStatus::Error),
            _ => Err(format!("Unknown worker status: {}", s)),
        }
    }
}

/// Latest known state of one worker, upserted by worker id.
///
/// Heartbeats are an observability side channel: execution never reads
/// them back, operators do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Worker identity, the upsert key
    pub worker_id: String,
    /// Worker name for display
    pub worker_name: String,
    /// Current state
    pub status: WorkerStatus,
    /// Task id while working, failure text while in error
    pub detail: Option<String>,
    /// Last state-change timestamp
    pub updated_at: DateTime<Utc>,
}

impl Heartbeat {
    /// Build a heartbeat stamped with the current time.
    pub fn now(
        worker_id: impl Into<String>,
        worker_name: impl Into<String>,
        status: WorkerStatus,
        detail: Option<String>,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_name: worker_name.into(),
            status,
            detail,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_status_round_trips() {
        for status in [
            WorkerStatus::Working,
            WorkerStatus::Idle,
            WorkerStatus::Error,
        ] {
            let parsed: WorkerStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_heartbeat_carries_detail() {
        let beat = Heartbeat::now(
            "worker-script",
            "script",
            WorkerStatus::Error,
            Some("Policy Error: timeout after 120s".to_string()),
        );
        assert_eq!(beat.status, WorkerStatus::Error);
        assert!(beat.detail.as_deref().unwrap().contains("timeout"));
    }
}
