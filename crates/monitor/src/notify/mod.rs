//! Notification sinks and dispatch.
//!
//! Each enabled sink is validated once at startup; an enabled sink with
//! an incomplete configuration is skipped with a warning rather than
//! failing the whole process. Dispatch is best effort per sink and
//! never aborts the monitoring loop.

pub mod email;
pub mod format;
pub mod mattermost;
pub mod terminal;

use tracing::{info, warn};

use crate::conf::NotificationsConfig;
use crate::event::ErrorEvent;
use email::EmailNotifier;
use mattermost::MattermostNotifier;
use terminal::TerminalNotifier;

pub enum Notifier {
    Terminal(TerminalNotifier),
    Email(EmailNotifier),
    Mattermost(MattermostNotifier),
}

impl Notifier {
    pub fn name(&self) -> &'static str {
        match self {
            Notifier::Terminal(_) => "terminal",
            Notifier::Email(_) => "email",
            Notifier::Mattermost(_) => "mattermost",
        }
    }

    pub async fn send(&self, event: &ErrorEvent) -> bool {
        match self {
            Notifier::Terminal(sink) => sink.send(event),
            Notifier::Email(sink) => sink.send(event).await,
            Notifier::Mattermost(sink) => sink.send(event).await,
        }
    }
}

/// Instantiate the sinks enabled in `config`, dropping any whose
/// configuration is incomplete.
pub fn build_notifiers(config: &NotificationsConfig) -> Vec<Notifier> {
    let mut notifiers = Vec::new();

    if config.terminal.enabled {
        notifiers.push(Notifier::Terminal(TerminalNotifier));
    }
    if config.email.enabled {
        let sink = EmailNotifier::new(config.email.clone());
        if sink.is_valid() {
            notifiers.push(Notifier::Email(sink));
        } else {
            warn!("email notifications enabled but smtp_server, from_email or to_emails is missing");
        }
    }
    if config.mattermost.enabled {
        let sink = MattermostNotifier::new(config.mattermost.clone());
        if sink.is_valid() {
            notifiers.push(Notifier::Mattermost(sink));
        } else {
            warn!("mattermost notifications enabled but server_url, token or channel_id is missing");
        }
    }

    notifiers
}

/// Fan each event out to every sink.
pub async fn dispatch(notifiers: &[Notifier], events: &[ErrorEvent]) {
    for event in events {
        for notifier in notifiers {
            if notifier.send(event).await {
                info!(
                    sink = notifier.name(),
                    container = %event.container,
                    "notification sent"
                );
            } else {
                warn!(
                    sink = notifier.name(),
                    container = %event.container,
                    "notification delivery failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{EmailConfig, MattermostConfig, TerminalConfig};

    #[test]
    fn test_default_config_builds_terminal_only() {
        let notifiers = build_notifiers(&NotificationsConfig::default());
        assert_eq!(notifiers.len(), 1);
        assert_eq!(notifiers[0].name(), "terminal");
    }

    #[test]
    fn test_incomplete_sinks_are_skipped() {
        let config = NotificationsConfig {
            terminal: TerminalConfig { enabled: false },
            email: EmailConfig {
                enabled: true,
                ..EmailConfig::default()
            },
            mattermost: MattermostConfig {
                enabled: true,
                server_url: "chat.example.com".to_string(),
                ..MattermostConfig::default()
            },
        };
        assert!(build_notifiers(&config).is_empty());
    }

    #[test]
    fn test_complete_sinks_are_built() {
        let config = NotificationsConfig {
            terminal: TerminalConfig { enabled: true },
            email: EmailConfig {
                enabled: true,
                smtp_server: "smtp.example.com".to_string(),
                from_email: "monitor@example.com".to_string(),
                to_emails: vec!["ops@example.com".to_string()],
                ..EmailConfig::default()
            },
            mattermost: MattermostConfig {
                enabled: true,
                server_url: "chat.example.com".to_string(),
                token: "tok".to_string(),
                channel_id: "ch".to_string(),
                ..MattermostConfig::default()
            },
        };
        let names: Vec<_> = build_notifiers(&config).iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["terminal", "email", "mattermost"]);
    }
}
