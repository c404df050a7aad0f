//! MonitorConfig and related structs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Explicit allow-list of local containers. Empty = all running.
    pub containers: Vec<String>,
    /// Level tokens a line must contain (case-insensitive). Empty = any.
    pub log_levels: Vec<String>,
    /// Keywords a line must contain (case-insensitive). Empty = any.
    pub keywords: Vec<String>,
    pub blacklist: BlacklistConfig,
    /// Seconds between polling cycles.
    pub check_interval: u64,
    /// Occurrences of one fingerprint required before a notification fires.
    pub error_threshold: u32,
    /// Minimum minutes between two notifications for the same fingerprint.
    pub cooldown_minutes: u64,
    /// Seconds after which idle dedup entries are swept.
    pub deduplication_window: u64,
    /// Upper bound on dedup table entries after a cleanup pass.
    pub max_memory_entries: usize,
    /// Seconds between cleanup passes.
    pub cleanup_interval: u64,
    pub context_settings: ContextSettings,
    pub local_monitoring: LocalMonitoringConfig,
    pub ssh_settings: SshSettings,
    pub remote_servers: Vec<RemoteServerConfig>,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistConfig {
    pub keywords: Vec<String>,
    pub patterns: Vec<String>,
    pub containers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Character cap on one rendered context block.
    pub max_log_length: usize,
    /// Rolling log buffer capacity per (source, container).
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalMonitoringConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    /// Soft cap on concurrent remote checkouts; enforced by the
    /// scheduler's parallelism bound, not by blocking in the pool.
    pub max_connections: usize,
    /// Idle sessions kept per pool key.
    pub pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteServerConfig {
    /// Display name; falls back to `host` when absent.
    pub name: Option<String>,
    pub host: String,
    pub username: String,
    pub password: Option<String>,
    pub key_file: Option<String>,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    /// Per-operation timeout in seconds.
    #[serde(default = "default_remote_timeout")]
    pub timeout: u64,
    /// Explicit container list for this host. Empty = all running.
    #[serde(default)]
    pub containers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub terminal: TerminalConfig,
    pub email: EmailConfig,
    pub mattermost: MattermostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub to_emails: Vec<String>,
    /// true = implicit TLS (465); false = STARTTLS.
    pub ssl: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MattermostConfig {
    pub enabled: bool,
    pub server_url: String,
    pub token: String,
    pub channel_id: String,
    pub scheme: String,
    pub port: u16,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: 465,
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
            to_emails: Vec::new(),
            ssl: true,
        }
    }
}

impl Default for MattermostConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: String::new(),
            token: String::new(),
            channel_id: String::new(),
            scheme: "https".to_string(),
            port: 443,
        }
    }
}

fn default_ssh_port() -> u16 {
    22
}

fn default_remote_timeout() -> u64 {
    10
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            log_levels: vec!["ERROR".to_string(), "WARN".to_string()],
            keywords: Vec::new(),
            blacklist: BlacklistConfig::default(),
            check_interval: 5,
            error_threshold: 3,
            cooldown_minutes: 30,
            deduplication_window: 300,
            max_memory_entries: 1000,
            cleanup_interval: 3600,
            context_settings: ContextSettings::default(),
            local_monitoring: LocalMonitoringConfig::default(),
            ssh_settings: SshSettings::default(),
            remote_servers: Vec::new(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_log_length: 8000,
            buffer_size: 1000,
        }
    }
}

impl Default for LocalMonitoringConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            pool_size: 3,
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MonitorConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cooldown_minutes as i64)
    }

    pub fn deduplication_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.deduplication_window as i64)
    }
}

impl RemoteServerConfig {
    /// Display label for this server: configured name or host.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.host)
    }
}
