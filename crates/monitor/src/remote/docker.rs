//! Docker operations over a pooled SSH session.
//!
//! Two fixed remote commands: list running container names, and fetch a
//! bounded timestamped log tail since a cursor. Both run on a session
//! borrowed from [`SshConnectionPool`] and release it on every path.

use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::pool::{RemoteError, SshConnectionPool};
use crate::conf::RemoteServerConfig;

/// Tail bound on every remote fetch, mirroring the local adapter.
const LOG_TAIL_LINES: u32 = 500;

/// Marker Docker prints on stderr when the named container is absent.
const NO_SUCH_CONTAINER: &str = "No such container";

struct CommandOutput {
    stdout: String,
    stderr: String,
}

pub struct RemoteDocker {
    pool: Arc<SshConnectionPool>,
}

impl RemoteDocker {
    pub fn new(pool: Arc<SshConnectionPool>) -> Self {
        Self { pool }
    }

    /// Names of the containers running on `server`.
    pub fn list_running_containers(
        &self,
        server: &RemoteServerConfig,
    ) -> Result<Vec<String>, RemoteError> {
        let out = self.exec(server, "docker ps --format '{{.Names}}'")?;
        Ok(out
            .stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .collect())
    }

    /// Fetch up to the last 500 timestamped log lines of `container`
    /// emitted after `since`. An absent container yields an empty list.
    pub fn fetch_logs_since(
        &self,
        server: &RemoteServerConfig,
        container: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, RemoteError> {
        let since_arg = since.map(|cursor| since_argument(Utc::now(), cursor));
        let cmd = logs_command(container, since_arg.as_deref());
        debug!(host = %server.host, container, cmd = %cmd, "remote log fetch");
        let out = self.exec(server, &cmd)?;

        if out.stderr.contains(NO_SUCH_CONTAINER) {
            warn!(host = %server.host, container, "container absent on remote host");
            return Ok(Vec::new());
        }
        Ok(merge_log_output(&out.stdout, &out.stderr))
    }

    /// Startup probe: the remote Docker CLI must answer `--version`.
    pub fn check_docker_available(&self, server: &RemoteServerConfig) -> bool {
        match self.exec(server, "docker --version") {
            Ok(out) => out.stdout.contains("Docker version"),
            Err(e) => {
                warn!(host = %server.host, error = %e, "remote Docker probe failed");
                false
            }
        }
    }

    fn exec(&self, server: &RemoteServerConfig, cmd: &str) -> Result<CommandOutput, RemoteError> {
        let session = self.pool.acquire(server)?;
        let mut channel = session.channel_session()?;
        channel.exec(cmd)?;

        let mut stdout = String::new();
        channel.read_to_string(&mut stdout)?;
        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr)?;

        // Exit status is irrelevant here; failures surface on stderr.
        let _ = channel.wait_close();
        Ok(CommandOutput { stdout, stderr })
    }
}

/// Relative "N seconds ago" form Docker accepts for `--since`.
fn since_argument(now: DateTime<Utc>, cursor: DateTime<Utc>) -> String {
    let secs = (now - cursor).num_seconds().max(0);
    format!("{secs}s")
}

fn logs_command(container: &str, since: Option<&str>) -> String {
    let mut cmd = format!("docker logs --timestamps --tail {LOG_TAIL_LINES}");
    if let Some(since) = since {
        cmd.push_str(&format!(" --since {since}"));
    }
    cmd.push(' ');
    cmd.push_str(container);
    cmd
}

/// Docker sometimes writes log content to stderr instead of stdout:
/// empty stdout means stderr is the content, and when both carry text
/// they are concatenated. Blank lines are dropped.
fn merge_log_output(stdout: &str, stderr: &str) -> Vec<String> {
    let stdout = stdout.trim();
    let stderr = stderr.trim();
    let combined = if stdout.is_empty() {
        stderr.to_string()
    } else if stderr.is_empty() {
        stdout.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    };

    combined
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ── Command building ─────────────────────────────────────────

    #[test]
    fn test_since_argument_relative_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 30).unwrap();
        let cursor = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(since_argument(now, cursor), "90s");
    }

    #[test]
    fn test_since_argument_future_cursor_clamps_to_zero() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let cursor = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap();
        assert_eq!(since_argument(now, cursor), "0s");
    }

    #[test]
    fn test_logs_command_without_since() {
        assert_eq!(
            logs_command("api", None),
            "docker logs --timestamps --tail 500 api"
        );
    }

    #[test]
    fn test_logs_command_with_since() {
        assert_eq!(
            logs_command("api", Some("42s")),
            "docker logs --timestamps --tail 500 --since 42s api"
        );
    }

    // ── Output merging ───────────────────────────────────────────

    #[test]
    fn test_merge_prefers_stdout() {
        let lines = merge_log_output("a\nb\n", "");
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_uses_stderr_when_stdout_empty() {
        let lines = merge_log_output("", "err line\n");
        assert_eq!(lines, vec!["err line"]);
    }

    #[test]
    fn test_merge_concatenates_both() {
        let lines = merge_log_output("out\n", "err\n");
        assert_eq!(lines, vec!["out", "err"]);
    }

    #[test]
    fn test_merge_drops_blank_lines() {
        let lines = merge_log_output("a\n\n  \nb\n", "");
        assert_eq!(lines, vec!["a", "b"]);
    }
}
