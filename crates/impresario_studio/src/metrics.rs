//! Run counters for the studio daemon.

use impresario_showrunner::CycleOutcome;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated across the cycles of a studio run.
///
/// Counters only ever grow for the life of the process. Shared behind an
/// `Arc` between the server loop and whoever wants a [`snapshot`].
///
/// [`snapshot`]: StudioMetrics::snapshot
#[derive(Debug, Default)]
pub struct StudioMetrics {
    cycles_run: AtomicU64,
    cycles_failed: AtomicU64,
    tasks_drained: AtomicU64,
    tasks_decided: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_rejected: AtomicU64,
    early_stops: AtomicU64,
    last_cycle: Mutex<Option<CycleOutcome>>,
}

impl StudioMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finished cycle into the counters.
    pub fn record_cycle(&self, outcome: &CycleOutcome) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.tasks_drained
            .fetch_add(outcome.drained as u64, Ordering::Relaxed);
        self.tasks_decided
            .fetch_add(outcome.decided as u64, Ordering::Relaxed);
        self.tasks_completed
            .fetch_add(outcome.completed as u64, Ordering::Relaxed);
        self.tasks_rejected
            .fetch_add(outcome.rejected as u64, Ordering::Relaxed);
        if outcome.early_stop {
            self.early_stops.fetch_add(1, Ordering::Relaxed);
        }
        *self.last_cycle.lock() = Some(outcome.clone());
    }

    /// Count a cycle that errored out instead of finishing.
    pub fn record_failure(&self) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Outcome of the most recent finished cycle, if any.
    pub fn last_cycle(&self) -> Option<CycleOutcome> {
        self.last_cycle.lock().clone()
    }

    /// Copy the counters out for logging.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_run: self.cycles_run.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            tasks_drained: self.tasks_drained.load(Ordering::Relaxed),
            tasks_decided: self.tasks_decided.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
            early_stops: self.early_stops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the studio counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Cycles started, whether they finished or failed.
    pub cycles_run: u64,
    /// Cycles that errored out at the loop boundary.
    pub cycles_failed: u64,
    /// Carried-over tasks drained before deciding.
    pub tasks_drained: u64,
    /// New tasks accepted from decisions.
    pub tasks_decided: u64,
    /// Worker outputs routed to a destination.
    pub tasks_completed: u64,
    /// Worker outputs rejected by the router.
    pub tasks_rejected: u64,
    /// Cycles that stopped deciding due to backlog.
    pub early_stops: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcome(decided: usize, completed: usize, early_stop: bool) -> CycleOutcome {
        CycleOutcome {
            drained: 1,
            early_stop,
            decided,
            executed: decided,
            completed,
            rejected: decided.saturating_sub(completed),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_record_cycle_accumulates() {
        let metrics = StudioMetrics::new();

        metrics.record_cycle(&outcome(3, 2, false));
        metrics.record_cycle(&outcome(2, 2, true));

        let snap = metrics.snapshot();
        assert_eq!(snap.cycles_run, 2);
        assert_eq!(snap.cycles_failed, 0);
        assert_eq!(snap.tasks_drained, 2);
        assert_eq!(snap.tasks_decided, 5);
        assert_eq!(snap.tasks_completed, 4);
        assert_eq!(snap.tasks_rejected, 1);
        assert_eq!(snap.early_stops, 1);
    }

    #[test]
    fn test_failed_cycle_counts_as_run() {
        let metrics = StudioMetrics::new();

        metrics.record_cycle(&outcome(1, 1, false));
        metrics.record_failure();

        let snap = metrics.snapshot();
        assert_eq!(snap.cycles_run, 2);
        assert_eq!(snap.cycles_failed, 1);
        assert_eq!(metrics.last_cycle().map(|o| o.decided), Some(1));
    }
}
