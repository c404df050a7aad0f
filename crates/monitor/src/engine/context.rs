//! Context aggregation: find the diagnostic unit around a triggering
//! error line (the error plus its stack trace) and render it as a
//! bounded, human-readable block.

use super::buffer::strip_timestamp;

/// How far back the start boundary may extend.
const BACKWARD_SCAN_LINES: usize = 10;
/// How far forward continuation lines may extend the end boundary.
const FORWARD_SCAN_LINES: usize = 50;

/// Keywords that extend the start boundary backward.
const CONTEXT_KEYWORDS: [&str; 4] = ["error", "exception", "failed", "traceback"];

/// Substrings that mark a line as part of a stack trace.
const STACK_INDICATORS: [&str; 10] = [
    "traceback (most recent call last):",
    "file \"",
    "at ",
    "caused by:",
    "exception:",
    "error:",
    "    at ",
    "\tat ",
    "error in",
    "exception in",
];

/// Spliced between the halves of an over-long context block.
const TRUNCATION_MARKER: &str = "\n... [context truncated] ...\n";

pub fn is_stack_trace_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    STACK_INDICATORS.iter().any(|ind| lower.contains(ind))
}

/// Boundary search around `trigger`: walk backward up to 10 lines while
/// lines keep containing context keywords, then forward up to 50 lines
/// while lines are stack-trace indicators or indentation continuations.
/// Returns `[start, end)`.
pub fn find_boundaries(lines: &[String], trigger: usize) -> (usize, usize) {
    let mut start = trigger;
    let lowest = trigger.saturating_sub(BACKWARD_SCAN_LINES - 1);
    for i in (lowest..=trigger).rev() {
        let lower = lines[i].to_lowercase();
        if CONTEXT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            start = i;
        } else {
            break;
        }
    }

    let mut end = trigger + 1;
    let limit = lines.len().min(trigger + FORWARD_SCAN_LINES);
    for (i, line) in lines.iter().enumerate().take(limit).skip(trigger + 1) {
        if is_stack_trace_line(line) {
            end = i + 1;
        } else {
            if !line.starts_with(' ') && !line.starts_with('\t') {
                break;
            }
            end = i + 1;
        }
    }

    (start, end)
}

/// Render the `[start, end)` slice with timestamp prefixes stripped and
/// a legibility marker per line, capped at `max_length` characters.
pub fn render_context(
    lines: &[String],
    trigger: usize,
    start: usize,
    end: usize,
    max_length: usize,
) -> String {
    let mut rendered = Vec::new();
    for i in start..end.min(lines.len()) {
        let clean = strip_timestamp(&lines[i]);
        let marker = if i == trigger {
            "=> "
        } else if is_stack_trace_line(clean) {
            " | "
        } else if i < trigger {
            " ^ "
        } else {
            " v "
        };
        rendered.push(format!("{marker}{clean}"));
    }
    truncate_middle(&rendered.join("\n"), max_length)
}

/// Keep the head and tail of an over-long block with an elision marker
/// in between. The result never exceeds `max_length` characters.
fn truncate_middle(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    let half = max_length.saturating_sub(marker_len) / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{head}{TRUNCATION_MARKER}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    // ── Boundary search ──────────────────────────────────────────

    #[test]
    fn test_error_with_indented_trace_block() {
        let logs = lines(&[
            "ts INFO starting",
            "ts ERROR boom",
            "ts     at com.app.Service(Service.java:10)",
            "ts     at com.app.Main(Main.java:5)",
            "ts INFO recovered",
        ]);
        let (start, end) = find_boundaries(&logs, 1);
        assert_eq!((start, end), (1, 4));
    }

    #[test]
    fn test_five_trace_lines_exclude_trailing_unrelated() {
        let mut raw = vec!["ts ERROR explosion".to_string()];
        for i in 0..5 {
            raw.push(format!("ts     at frame{i}"));
        }
        raw.push("ts plain unrelated line".to_string());
        let (start, end) = find_boundaries(&raw, 0);
        assert_eq!((start, end), (0, 6));
    }

    #[test]
    fn test_backward_extension_over_error_lines() {
        let logs = lines(&[
            "ts ERROR first",
            "ts ERROR second",
            "ts ERROR third",
        ]);
        let (start, end) = find_boundaries(&logs, 2);
        assert_eq!((start, end), (0, 3));
    }

    #[test]
    fn test_backward_stops_at_non_error_line() {
        let logs = lines(&[
            "ts ERROR unrelated earlier",
            "ts INFO separator",
            "ts ERROR trigger",
        ]);
        let (start, end) = find_boundaries(&logs, 2);
        assert_eq!((start, end), (2, 3));
    }

    #[test]
    fn test_backward_scan_is_bounded() {
        let mut raw: Vec<String> = (0..30).map(|i| format!("ts ERROR wave {}", "z".repeat(i + 1))).collect();
        raw.push("ts ERROR trigger".to_string());
        let (start, _) = find_boundaries(&raw, 30);
        // At most 10 lines including the trigger.
        assert_eq!(start, 21);
    }

    #[test]
    fn test_forward_scan_is_bounded() {
        let mut raw = vec!["ts ERROR trigger".to_string()];
        for i in 0..80 {
            raw.push(format!("ts     at frame{i}"));
        }
        let (_, end) = find_boundaries(&raw, 0);
        assert_eq!(end, FORWARD_SCAN_LINES);
    }

    #[test]
    fn test_boundaries_idempotent_on_trimmed_segment() {
        let logs = lines(&[
            "ts ERROR boom",
            "ts     at frame0",
            "ts     at frame1",
            "ts INFO next",
        ]);
        let (start, end) = find_boundaries(&logs, 0);
        let segment: Vec<String> = logs[start..end].to_vec();
        let (start2, end2) = find_boundaries(&segment, 0);
        assert_eq!((start2, end2), (0, segment.len()));
    }

    // ── Stack-trace detection ────────────────────────────────────

    #[test]
    fn test_stack_indicators() {
        assert!(is_stack_trace_line("Traceback (most recent call last):"));
        assert!(is_stack_trace_line("  File \"app.py\", line 3"));
        assert!(is_stack_trace_line("\tat com.app.Main.run(Main.java:10)"));
        assert!(is_stack_trace_line("Caused by: java.io.IOException"));
        assert!(!is_stack_trace_line("all systems nominal"));
    }

    // ── Rendering ────────────────────────────────────────────────

    #[test]
    fn test_render_strips_timestamps_and_marks_trigger() {
        let logs = lines(&[
            "2024-01-01T00:00:00Z ERROR boom",
            "2024-01-01T00:00:01Z     at frame0",
        ]);
        let rendered = render_context(&logs, 0, 0, 2, 8000);
        assert!(rendered.starts_with("=> ERROR boom"));
        assert!(rendered.contains("at frame0"));
        assert!(!rendered.contains("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_render_respects_length_cap() {
        let logs: Vec<String> = (0..200)
            .map(|i| format!("ts ERROR padding padding padding line number {i}"))
            .collect();
        let rendered = render_context(&logs, 0, 0, logs.len(), 500);
        assert!(rendered.chars().count() <= 500);
        assert!(rendered.contains("... [context truncated] ..."));
    }

    #[test]
    fn test_truncate_preserves_head_and_tail() {
        let text = "a".repeat(400) + &"b".repeat(400);
        let out = truncate_middle(&text, 100);
        assert!(out.chars().count() <= 100);
        assert!(out.starts_with("aaa"));
        assert!(out.ends_with("bbb"));
        assert!(out.contains(TRUNCATION_MARKER.trim()));
    }

    #[test]
    fn test_truncate_noop_under_cap() {
        let text = "short context";
        assert_eq!(truncate_middle(text, 100), text);
    }

    #[test]
    fn test_truncate_is_char_boundary_safe() {
        let text = "é".repeat(300);
        let out = truncate_middle(&text, 100);
        assert!(out.chars().count() <= 100);
    }
}
