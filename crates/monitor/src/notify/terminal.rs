//! Terminal sink: prints the event to stdout.

use crate::event::ErrorEvent;

use super::format::format_text;

const RULE: &str = "==================================================";

#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl TerminalNotifier {
    pub fn send(&self, event: &ErrorEvent) -> bool {
        println!("\n{}", event.title());
        println!("{RULE}");
        println!("{}", format_text(event));
        println!("{RULE}");
        true
    }
}
