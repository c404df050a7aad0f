//! Monitor engine: per-source rolling buffers, the filter pipeline,
//! the dedup/cooldown state machine, and context aggregation.

pub mod buffer;
pub mod context;
pub mod dedup;
pub mod filter;
pub mod fingerprint;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::conf::MonitorConfig;
use crate::event::ErrorEvent;
use crate::source::LogSource;
use buffer::{ContainerState, LogBuffer};
use dedup::DedupTable;
use filter::FilterPipeline;

/// The per-engine knobs the processing loop needs; lifted out of
/// [`MonitorConfig`] once at startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub threshold: u32,
    pub cooldown: chrono::Duration,
    pub max_log_length: usize,
    pub buffer_size: usize,
}

impl EngineSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            threshold: config.error_threshold,
            cooldown: config.cooldown(),
            max_log_length: config.context_settings.max_log_length,
            buffer_size: config.context_settings.buffer_size,
        }
    }
}

/// One engine per source. Per-container state lives in a `DashMap`;
/// within a cycle each (source, container) pair is touched by exactly
/// one scheduler task, so entries are never contended mid-container.
pub struct MonitorEngine {
    source: LogSource,
    filter: Arc<FilterPipeline>,
    dedup: DedupTable,
    states: DashMap<String, ContainerState>,
    settings: EngineSettings,
}

impl MonitorEngine {
    pub fn new(source: LogSource, filter: Arc<FilterPipeline>, settings: EngineSettings) -> Self {
        Self {
            source,
            filter,
            dedup: DedupTable::new(),
            states: DashMap::new(),
            settings,
        }
    }

    pub fn source(&self) -> &LogSource {
        &self.source
    }

    /// Containers this engine should poll: the configured allow-list
    /// (or everything running), minus blacklisted names.
    pub async fn monitored_containers(&self) -> Vec<String> {
        let mut containers = self.source.list_containers().await;
        containers.retain(|c| !self.filter.container_blacklisted(c));
        containers
    }

    /// Run one poll for `container`: fetch since the cursor, then scan
    /// the buffer for qualifying errors.
    pub async fn process_container(&self, container: &str) -> Vec<ErrorEvent> {
        let cursor = self.states.get(container).and_then(|s| s.cursor);
        let lines = self.source.fetch_logs_since(container, cursor).await;
        if lines.is_empty() {
            return Vec::new();
        }
        self.ingest(container, lines, Utc::now())
    }

    /// Synchronous core of `process_container`, parameterised on `now`
    /// so the dedup timing is testable.
    pub fn ingest(
        &self,
        container: &str,
        lines: Vec<String>,
        now: DateTime<Utc>,
    ) -> Vec<ErrorEvent> {
        let mut state = self
            .states
            .entry(container.to_string())
            .or_insert_with(|| ContainerState::new(LogBuffer::new(self.settings.buffer_size)));

        state.advance_cursor(&lines, now);
        state.buffer.extend(lines);

        let mut events = Vec::new();
        let mut consumed: HashSet<usize> = HashSet::new();
        let buffer = state.buffer.as_slice();

        for i in 0..buffer.len() {
            if consumed.contains(&i) {
                continue;
            }
            let line = &buffer[i];
            if !self.filter.matches(container, line) {
                continue;
            }

            let key = fingerprint::scoped_error_key(self.source.scope(), container, line);
            let decision =
                self.dedup
                    .record(&key, now, self.settings.threshold, self.settings.cooldown);
            if !decision.notify {
                continue;
            }

            let (start, end) = context::find_boundaries(buffer, i);
            let rendered =
                context::render_context(buffer, i, start, end, self.settings.max_log_length);
            consumed.extend(start..end.min(buffer.len()));

            debug!(
                source = self.source.label(),
                container,
                count = decision.count,
                "error qualified for notification"
            );
            events.push(ErrorEvent {
                server: self.source.scope().map(|s| s.to_string()),
                container: container.to_string(),
                context: rendered,
                count: decision.count,
                threshold: self.settings.threshold,
                timestamp: now,
            });
        }

        state.buffer.remove_indices(&consumed);
        events
    }

    /// Sweep stale dedup entries and enforce the memory bound.
    /// Returns the number of live entries afterwards.
    pub fn cleanup(
        &self,
        now: DateTime<Utc>,
        window: chrono::Duration,
        max_entries: usize,
    ) -> usize {
        self.dedup.cleanup(now, window, max_entries);
        self.dedup.len()
    }

    #[cfg(test)]
    pub(crate) fn buffer_len(&self, container: &str) -> usize {
        self.states.get(container).map(|s| s.buffer.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self, container: &str) -> Option<DateTime<Utc>> {
        self.states.get(container).and_then(|s| s.cursor)
    }

    #[cfg(test)]
    pub(crate) fn dedup_len(&self) -> usize {
        self.dedup.len()
    }
}
