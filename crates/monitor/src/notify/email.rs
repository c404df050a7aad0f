//! Email sink over SMTP.
//!
//! `ssl = true` uses implicit TLS (typically port 465), otherwise the
//! connection upgrades via STARTTLS. `lettre`'s transport is blocking,
//! so sends run on the blocking pool.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::warn;

use crate::conf::EmailConfig;
use crate::event::ErrorEvent;

#[derive(Debug, Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_valid(&self) -> bool {
        !self.config.smtp_server.is_empty()
            && !self.config.from_email.is_empty()
            && !self.config.to_emails.is_empty()
    }

    pub async fn send(&self, event: &ErrorEvent) -> bool {
        let config = self.config.clone();
        let subject = format!("[Docker Monitor] {}", event.title());
        let body = html_body(event);

        let sent = tokio::task::spawn_blocking(move || deliver(&config, &subject, &body)).await;
        match sent {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "email notification failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "email send task failed");
                false
            }
        }
    }
}

fn deliver(config: &EmailConfig, subject: &str, body: &str) -> Result<(), String> {
    let mut builder = Message::builder()
        .from(
            config
                .from_email
                .parse()
                .map_err(|e| format!("bad from address: {e}"))?,
        )
        .subject(subject)
        .header(ContentType::TEXT_HTML);
    for to in &config.to_emails {
        builder = builder.to(to.parse().map_err(|e| format!("bad to address: {e}"))?);
    }
    let message = builder
        .body(body.to_string())
        .map_err(|e| format!("building message: {e}"))?;

    let relay = if config.ssl {
        SmtpTransport::relay(&config.smtp_server)
    } else {
        SmtpTransport::starttls_relay(&config.smtp_server)
    }
    .map_err(|e| format!("smtp relay: {e}"))?;

    let mut relay = relay.port(config.smtp_port);
    if !config.username.is_empty() {
        relay = relay.credentials(Credentials::new(
            config.username.clone(),
            config.password.clone(),
        ));
    }

    relay
        .build()
        .send(&message)
        .map(|_| ())
        .map_err(|e| format!("smtp send: {e}"))
}

fn html_body(event: &ErrorEvent) -> String {
    format!(
        "<html>\n\
         <body style=\"font-family: Arial, sans-serif;\">\n\
         <h2 style=\"color: #d32f2f;\">{title}</h2>\n\
         <div style=\"background-color: #f5f5f5; padding: 15px; border-radius: 5px;\">\n\
         <pre style=\"white-space: pre-wrap; word-wrap: break-word;\">{body}</pre>\n\
         </div>\n\
         <hr>\n\
         <p style=\"color: #666; font-size: 12px;\">\n\
         Sent: {timestamp}<br>\n\
         Container: {container}\n\
         </p>\n\
         </body>\n\
         </html>",
        title = event.title(),
        body = super::format::format_text(event),
        timestamp = event.formatted_timestamp(),
        container = event.container,
    )
}
