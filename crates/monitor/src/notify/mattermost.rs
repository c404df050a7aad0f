//! Mattermost sink: posts to a channel through the REST API.

use reqwest::Client;
use serde_json::json;
use tracing::warn;

use crate::conf::MattermostConfig;
use crate::event::ErrorEvent;

use super::format::format_markdown;

#[derive(Debug, Clone)]
pub struct MattermostNotifier {
    config: MattermostConfig,
    client: Client,
}

impl MattermostNotifier {
    pub fn new(config: MattermostConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.config.server_url.is_empty()
            && !self.config.token.is_empty()
            && !self.config.channel_id.is_empty()
    }

    fn post_url(&self) -> String {
        format!(
            "{}://{}:{}/api/v4/posts",
            self.config.scheme, self.config.server_url, self.config.port
        )
    }

    pub async fn send(&self, event: &ErrorEvent) -> bool {
        let message = format!("## {}\n\n{}", event.title(), format_markdown(event));
        let response = self
            .client
            .post(self.post_url())
            .bearer_auth(&self.config.token)
            .json(&json!({
                "channel_id": self.config.channel_id,
                "message": message,
            }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), "mattermost notification rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "mattermost notification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MattermostConfig {
        MattermostConfig {
            enabled: true,
            server_url: "chat.example.com".to_string(),
            token: "tok".to_string(),
            channel_id: "ch".to_string(),
            ..MattermostConfig::default()
        }
    }

    #[test]
    fn test_post_url_uses_scheme_and_port() {
        let notifier = MattermostNotifier::new(config());
        assert_eq!(
            notifier.post_url(),
            "https://chat.example.com:443/api/v4/posts"
        );
    }

    #[test]
    fn test_validation_requires_token_and_channel() {
        assert!(MattermostNotifier::new(config()).is_valid());
        let mut incomplete = config();
        incomplete.token.clear();
        assert!(!MattermostNotifier::new(incomplete).is_valid());
    }
}
