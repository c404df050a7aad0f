//! Local log operations: list running containers, fetch a bounded
//! timestamped log tail since a cursor.

use bollard::models::ContainerStateStatusEnum;
use bollard::query_parameters::{ListContainersOptions, LogsOptions};
use chrono::{DateTime, Utc};
use futures_util::stream::StreamExt;

use super::client::{DockerClient, DockerError};

/// Tail bound on every fetch; the rolling buffer is the real memory cap.
const LOG_TAIL_LINES: u32 = 500;

impl DockerClient {
    /// Names of all currently running containers.
    pub async fn list_running_containers(&self) -> Result<Vec<String>, DockerError> {
        // Default options list running containers only.
        let containers = self
            .client
            .list_containers(Some(ListContainersOptions::default()))
            .await?;
        Ok(containers
            .into_iter()
            .filter_map(|c| {
                c.names
                    .as_deref()
                    .and_then(|n| n.first())
                    .map(|n| n.trim_start_matches('/').to_string())
            })
            .collect())
    }

    /// Fetch up to the last 500 timestamped log lines of `name` emitted
    /// after `since`. A stopped or missing container yields an empty
    /// list, not an error.
    pub async fn fetch_logs_since(
        &self,
        name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, DockerError> {
        match self.container_running(name).await {
            Ok(true) => {}
            Ok(false) => return Ok(Vec::new()),
            Err(DockerError::ContainerNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }

        // Bollard v0.20 takes i32 Unix seconds for since/until.
        let since_secs = since
            .map(|t| t.timestamp().clamp(0, i32::MAX as i64) as i32)
            .unwrap_or(0);

        let options = LogsOptions {
            follow: false,
            stdout: true,
            stderr: true,
            since: since_secs,
            until: 0,
            timestamps: true,
            tail: LOG_TAIL_LINES.to_string(),
        };

        let mut stream = self.client.logs(name, Some(options));
        let mut raw = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(output) => {
                    let bytes = output.into_bytes();
                    raw.push_str(&String::from_utf8_lossy(&bytes));
                }
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                }) => return Ok(Vec::new()),
                Err(e) => return Err(DockerError::from(e)),
            }
        }

        Ok(raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    /// Whether the container currently reports the "running" state.
    async fn container_running(&self, name: &str) -> Result<bool, DockerError> {
        let details = self
            .client
            .inspect_container(name, None)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => DockerError::ContainerNotFound(name.to_string()),
                other => DockerError::BollardError(other),
            })?;
        Ok(details
            .state
            .and_then(|s| s.status)
            .map(|s| s == ContainerStateStatusEnum::RUNNING)
            .unwrap_or(false))
    }
}
