//! Multi-host fan-out scheduler.
//!
//! One task per (source, container) pair per cycle, gated by a
//! semaphore of `min(source_count, 5)` permits so a slow host cannot
//! monopolise the cycle or exhaust the connection pool. Task failures
//! are isolated: a panicking or aborted task loses only its own
//! results.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

use crate::engine::MonitorEngine;
use crate::event::ErrorEvent;

/// Upper bound on concurrent per-container tasks.
const MAX_WORKERS: usize = 5;

pub struct Scheduler {
    engines: Vec<Arc<MonitorEngine>>,
    max_workers: usize,
}

impl Scheduler {
    pub fn new(engines: Vec<Arc<MonitorEngine>>) -> Self {
        let max_workers = engines.len().clamp(1, MAX_WORKERS);
        Self {
            engines,
            max_workers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn source_count(&self) -> usize {
        self.engines.len()
    }

    /// Poll every (source, container) pair once and merge the resulting
    /// events into one flat list. Order across containers is not
    /// meaningful.
    pub async fn run_cycle(&self) -> Vec<ErrorEvent> {
        if self.engines.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks: JoinSet<Vec<ErrorEvent>> = JoinSet::new();

        for engine in &self.engines {
            let containers = engine.monitored_containers().await;
            for container in containers {
                let engine = Arc::clone(engine);
                let semaphore = Arc::clone(&semaphore);
                tasks.spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return Vec::new(),
                    };
                    engine.process_container(&container).await
                });
            }
        }

        let mut events = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(task_events) => events.extend(task_events),
                // A failed task loses only its own (source, container)
                // pair for this cycle.
                Err(e) => error!(error = %e, "container monitor task failed"),
            }
        }
        events
    }

    /// Sweep every engine's dedup table.
    pub fn cleanup(
        &self,
        now: DateTime<Utc>,
        window: chrono::Duration,
        max_entries: usize,
    ) -> usize {
        self.engines
            .iter()
            .map(|engine| engine.cleanup(now, window, max_entries))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::MonitorConfig;
    use crate::engine::{EngineSettings, MonitorEngine};
    use crate::engine::filter::FilterPipeline;
    use crate::source::LogSource;

    fn engine(label: &str) -> Arc<MonitorEngine> {
        let config = MonitorConfig::default();
        Arc::new(MonitorEngine::new(
            LogSource::detached_scoped(label),
            Arc::new(FilterPipeline::new(&config)),
            EngineSettings::from_config(&config),
        ))
    }

    #[test]
    fn test_worker_bound() {
        assert_eq!(Scheduler::new(vec![engine("a")]).max_workers, 1);
        assert_eq!(
            Scheduler::new((0..3).map(|i| engine(&format!("s{i}"))).collect()).max_workers,
            3
        );
        assert_eq!(
            Scheduler::new((0..12).map(|i| engine(&format!("s{i}"))).collect()).max_workers,
            5
        );
    }

    #[tokio::test]
    async fn test_empty_scheduler_yields_no_events() {
        let scheduler = Scheduler::new(Vec::new());
        assert!(scheduler.run_cycle().await.is_empty());
    }

    #[tokio::test]
    async fn test_detached_sources_yield_no_events() {
        // Detached sources list no containers; the cycle must still
        // complete cleanly.
        let scheduler = Scheduler::new(vec![engine("a"), engine("b")]);
        assert!(scheduler.run_cycle().await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_host_does_not_block_others() {
        let config = MonitorConfig::default();
        let filter = Arc::new(FilterPipeline::new(&config));
        let settings = EngineSettings::from_config(&config);

        // One host whose fetches fail mid-cycle, one healthy host
        // crossing the threshold in the same cycle.
        let failing = Arc::new(MonitorEngine::new(
            LogSource::detached_failing("prod-eu"),
            Arc::clone(&filter),
            settings.clone(),
        ));
        let healthy = Arc::new(MonitorEngine::new(
            LogSource::detached_serving(
                "local",
                vec!["api".to_string()],
                vec!["2024-01-01T00:00:00Z ERROR db down".to_string(); 3],
            ),
            filter,
            settings,
        ));

        let scheduler = Scheduler::new(vec![failing, healthy]);
        let events = scheduler.run_cycle().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].container, "api");
        assert_eq!(events[0].count, 3);
    }
}
