//! The interval loop that keeps the showrunner producing.

use crate::metrics::StudioMetrics;
use impresario_interface::CompletionDriver;
use impresario_showrunner::Showrunner;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Drives the showrunner on a fixed cadence until shutdown.
///
/// One cycle runs at a time; a shutdown future (normally CTRL+C) ends the
/// loop between cycles.
pub struct StudioServer<D> {
    showrunner: Showrunner<D>,
    cycle_interval: Duration,
    metrics: Arc<StudioMetrics>,
}

impl<D: CompletionDriver> StudioServer<D> {
    /// Wrap a showrunner in an interval loop.
    pub fn new(showrunner: Showrunner<D>, cycle_interval: Duration) -> Self {
        Self {
            showrunner,
            cycle_interval,
            metrics: Arc::new(StudioMetrics::new()),
        }
    }

    /// Counters shared with the run loop.
    pub fn metrics(&self) -> Arc<StudioMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run one guarded cycle.
    ///
    /// Cycle errors are logged and counted here; they never escape, so a
    /// failed cycle cannot take the daemon down.
    pub async fn run_once(&self) {
        match self.showrunner.run_cycle().await {
            Ok(outcome) => {
                self.metrics.record_cycle(&outcome);
            }
            Err(e) => {
                self.metrics.record_failure();
                tracing::error!("Cycle failed: {e}");
            }
        }
    }

    /// Run cycles on the configured interval until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. A cycle that overruns the
    /// interval delays the next tick instead of bursting catch-up cycles.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, stopping cycle loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impresario_interface::{ShowStore, StoreObserver, TaskStore, TelemetryStore};
    use impresario_models::ScriptedDriver;
    use impresario_showrunner::{PlaybookLibrary, ShowrunnerConfig, TroupeRegistry};
    use impresario_storage::MemoryStore;

    fn server(replies: Vec<&str>) -> StudioServer<ScriptedDriver> {
        let store = Arc::new(MemoryStore::new());
        let observer = Arc::new(StoreObserver::new(store.clone() as Arc<dyn TelemetryStore>));
        let runner = Showrunner::new(
            Arc::new(ScriptedDriver::new(replies)),
            store.clone() as Arc<dyn TaskStore>,
            store.clone() as Arc<dyn ShowStore>,
            Arc::new(TroupeRegistry::default_troupe()),
            PlaybookLibrary::builtin(),
            observer,
            ShowrunnerConfig::default(),
        );
        StudioServer::new(runner, Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_run_once_records_metrics() {
        let server = server(vec![
            r#"[{"worker": "lore", "task_type": "record_fact", "description": "note the tides"}]"#,
            r#"{"fact": "The tides obey the moon"}"#,
        ]);

        server.run_once().await;

        let snap = server.metrics().snapshot();
        assert_eq!(snap.cycles_run, 1);
        assert_eq!(snap.cycles_failed, 0);
        assert_eq!(snap.tasks_decided, 1);
        assert_eq!(snap.tasks_completed, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_after_first_cycle() {
        let server = server(vec!["[]"]);

        // Resolves once polled, so the loop sees it right after the
        // immediate first tick.
        server.run(std::future::ready(())).await;

        assert!(server.metrics().snapshot().cycles_run <= 1);
    }
}
