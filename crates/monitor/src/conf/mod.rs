//! Configuration model, loading, and validation.

pub mod load;
pub mod model;

pub use load::ConfigError;
pub use model::{
    BlacklistConfig, ContextSettings, EmailConfig, MattermostConfig, MonitorConfig,
    NotificationsConfig, RemoteServerConfig, SshSettings, TerminalConfig,
};
