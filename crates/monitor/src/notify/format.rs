//! Text and markdown renderings of an error event.

use crate::event::ErrorEvent;

/// Plain-text body for terminal and email sinks.
pub fn format_text(event: &ErrorEvent) -> String {
    format!(
        "{title}\n\
         ==================================================\n\
         Container: {container}\n\
         Count: {count}/{threshold}\n\
         Time: {timestamp}\n\
         Context lines: {lines}\n\
         \n\
         Error context:\n\
         {context}",
        title = event.title(),
        container = event.container,
        count = event.count,
        threshold = event.threshold,
        timestamp = event.formatted_timestamp(),
        lines = event.context_lines(),
        context = event.context,
    )
}

/// Markdown body for chat sinks.
pub fn format_markdown(event: &ErrorEvent) -> String {
    format!(
        "### {title}\n\
         **Container:** `{container}`\n\
         **Count:** `{count}/{threshold}`\n\
         **Time:** `{timestamp}`\n\
         **Context lines:** `{lines}`\n\
         \n\
         **Error context:**\n\
         ```\n\
         {context}\n\
         ```",
        title = event.title(),
        container = event.container,
        count = event.count,
        threshold = event.threshold,
        timestamp = event.formatted_timestamp(),
        lines = event.context_lines(),
        context = event.context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event() -> ErrorEvent {
        ErrorEvent {
            server: Some("prod-1".to_string()),
            container: "api".to_string(),
            context: "=> ERROR boom\n | at com.app.Main".to_string(),
            count: 3,
            threshold: 3,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_text_carries_all_fields() {
        let body = format_text(&event());
        assert!(body.contains("Docker error - prod-1:api"));
        assert!(body.contains("Count: 3/3"));
        assert!(body.contains("Context lines: 2"));
        assert!(body.contains("=> ERROR boom"));
        assert!(body.contains("2024-05-01 12:00:00 UTC"));
    }

    #[test]
    fn test_markdown_fences_context() {
        let body = format_markdown(&event());
        assert!(body.starts_with("### Docker error - prod-1:api"));
        assert!(body.contains("**Count:** `3/3`"));
        assert!(body.contains("```\n=> ERROR boom\n | at com.app.Main\n```"));
    }
}
