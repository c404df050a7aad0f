//! Polymorphic log source: the monitor engine sees one capability
//! (`list_containers`, `fetch_logs_since`, `probe`) over two variants.
//!
//! Source failures are transient by design: they are logged and turn
//! into empty results, so one bad host or container only loses its own
//! cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::conf::RemoteServerConfig;
use crate::docker::DockerClient;
use crate::remote::RemoteDocker;

pub enum LogSource {
    Local(LocalSource),
    Remote(RemoteSource),
    /// Test-only source with no backing runtime.
    #[cfg(test)]
    Detached(DetachedSource),
}

pub struct LocalSource {
    docker: DockerClient,
    /// Explicit allow-list; empty = all running containers.
    allowed: Vec<String>,
}

pub struct RemoteSource {
    docker: Arc<RemoteDocker>,
    server: RemoteServerConfig,
}

#[cfg(test)]
pub struct DetachedSource {
    label: String,
    scope: Option<String>,
    containers: Vec<String>,
    /// Served to every container on each fetch.
    lines: Vec<String>,
    /// A failing source lists nothing and serves nothing, matching the
    /// logged-and-empty behaviour of the real variants.
    fail: bool,
}

impl LogSource {
    pub fn local(docker: DockerClient, allowed: Vec<String>) -> Self {
        LogSource::Local(LocalSource { docker, allowed })
    }

    pub fn remote(docker: Arc<RemoteDocker>, server: RemoteServerConfig) -> Self {
        LogSource::Remote(RemoteSource { docker, server })
    }

    #[cfg(test)]
    pub fn detached(label: &str) -> Self {
        LogSource::Detached(DetachedSource {
            label: label.to_string(),
            scope: None,
            containers: Vec::new(),
            lines: Vec::new(),
            fail: false,
        })
    }

    #[cfg(test)]
    pub fn detached_scoped(label: &str) -> Self {
        LogSource::Detached(DetachedSource {
            label: label.to_string(),
            scope: Some(label.to_string()),
            containers: Vec::new(),
            lines: Vec::new(),
            fail: false,
        })
    }

    #[cfg(test)]
    pub fn detached_serving(label: &str, containers: Vec<String>, lines: Vec<String>) -> Self {
        LogSource::Detached(DetachedSource {
            label: label.to_string(),
            scope: None,
            containers,
            lines,
            fail: false,
        })
    }

    #[cfg(test)]
    pub fn detached_failing(label: &str) -> Self {
        LogSource::Detached(DetachedSource {
            label: label.to_string(),
            scope: Some(label.to_string()),
            containers: vec!["unreachable".to_string()],
            lines: Vec::new(),
            fail: true,
        })
    }

    /// Display label for logs and event titles.
    pub fn label(&self) -> &str {
        match self {
            LogSource::Local(_) => "local",
            LogSource::Remote(remote) => remote.server.label(),
            #[cfg(test)]
            LogSource::Detached(detached) => &detached.label,
        }
    }

    /// Fingerprint scope: local fingerprints are container-scoped only;
    /// remote fingerprints carry the server label.
    pub fn scope(&self) -> Option<&str> {
        match self {
            LogSource::Local(_) => None,
            LogSource::Remote(remote) => Some(remote.server.label()),
            #[cfg(test)]
            LogSource::Detached(detached) => detached.scope.as_deref(),
        }
    }

    /// Containers to poll this cycle. Configured allow-lists win;
    /// otherwise everything currently running. Failures yield an empty
    /// list for this cycle.
    pub async fn list_containers(&self) -> Vec<String> {
        match self {
            LogSource::Local(local) => {
                if !local.allowed.is_empty() {
                    return local.allowed.clone();
                }
                match local.docker.list_running_containers().await {
                    Ok(containers) => containers,
                    Err(e) => {
                        error!(error = %e, "failed to list local containers");
                        Vec::new()
                    }
                }
            }
            LogSource::Remote(remote) => {
                if !remote.server.containers.is_empty() {
                    return remote.server.containers.clone();
                }
                let docker = Arc::clone(&remote.docker);
                let server = remote.server.clone();
                let host = server.label().to_string();
                run_blocking(move || docker.list_running_containers(&server))
                    .await
                    .unwrap_or_else(|e| {
                        error!(host = %host, error = %e, "failed to list remote containers");
                        Vec::new()
                    })
            }
            #[cfg(test)]
            LogSource::Detached(detached) => detached.containers.clone(),
        }
    }

    /// Ordered raw log lines of `container` emitted after `cursor`.
    pub async fn fetch_logs_since(
        &self,
        container: &str,
        cursor: Option<DateTime<Utc>>,
    ) -> Vec<String> {
        match self {
            LogSource::Local(local) => {
                match local.docker.fetch_logs_since(container, cursor).await {
                    Ok(lines) => lines,
                    Err(e) => {
                        error!(container, error = %e, "failed to fetch local logs");
                        Vec::new()
                    }
                }
            }
            LogSource::Remote(remote) => {
                let docker = Arc::clone(&remote.docker);
                let server = remote.server.clone();
                let host = server.label().to_string();
                let name = container.to_string();
                run_blocking(move || docker.fetch_logs_since(&server, &name, cursor))
                    .await
                    .unwrap_or_else(|e| {
                        error!(host = %host, container, error = %e, "failed to fetch remote logs");
                        Vec::new()
                    })
            }
            #[cfg(test)]
            LogSource::Detached(detached) => {
                if detached.fail {
                    error!(container, "failed to fetch logs");
                    Vec::new()
                } else {
                    detached.lines.clone()
                }
            }
        }
    }

    /// Startup reachability probe; an unreachable source is excluded
    /// from the run, not retried.
    pub async fn probe(&self) -> bool {
        match self {
            LogSource::Local(local) => match local.docker.ping().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "local Docker daemon not reachable");
                    false
                }
            },
            LogSource::Remote(remote) => {
                let docker = Arc::clone(&remote.docker);
                let server = remote.server.clone();
                matches!(
                    run_blocking(move || Ok(docker.check_docker_available(&server))).await,
                    Ok(true)
                )
            }
            #[cfg(test)]
            LogSource::Detached(_) => true,
        }
    }
}

/// Run a blocking SSH operation off the async runtime. A cancelled or
/// panicked worker surfaces as an error result.
async fn run_blocking<T, F>(f: F) -> Result<T, crate::remote::RemoteError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, crate::remote::RemoteError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(join_err) => {
            error!(error = %join_err, "blocking remote operation aborted");
            Err(std::io::Error::other(join_err.to_string()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_detached_source_shape() {
        let local_like = LogSource::detached("local");
        assert_eq!(local_like.label(), "local");
        assert_eq!(local_like.scope(), None);
        assert!(local_like.list_containers().await.is_empty());

        let remote_like = LogSource::detached_scoped("prod-eu");
        assert_eq!(remote_like.label(), "prod-eu");
        assert_eq!(remote_like.scope(), Some("prod-eu"));
    }

    #[tokio::test]
    async fn test_detached_serving_source() {
        let source = LogSource::detached_serving(
            "local",
            vec!["api".to_string()],
            vec!["2024-01-01T00:00:00Z ERROR boom".to_string()],
        );
        assert_eq!(source.list_containers().await, vec!["api"]);
        assert_eq!(source.fetch_logs_since("api", None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_source_lists_but_fetches_empty() {
        let source = LogSource::detached_failing("prod-eu");
        assert_eq!(source.list_containers().await, vec!["unreachable"]);
        assert!(source.fetch_logs_since("unreachable", None).await.is_empty());
    }
}
