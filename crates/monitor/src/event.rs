//! The structured error event handed to notification sinks.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Immutable once constructed; owned by the dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    /// Remote server label; `None` for the local source.
    pub server: Option<String>,
    pub container: String,
    /// Rendered diagnostic context (error line plus surrounding trace).
    pub context: String,
    /// Occurrences accumulated when the threshold was crossed.
    pub count: u32,
    pub threshold: u32,
    pub timestamp: DateTime<Utc>,
}

impl ErrorEvent {
    pub fn title(&self) -> String {
        format!(
            "Docker error - {}:{}",
            self.server.as_deref().unwrap_or("local"),
            self.container
        )
    }

    pub fn context_lines(&self) -> usize {
        self.context.lines().count()
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}
