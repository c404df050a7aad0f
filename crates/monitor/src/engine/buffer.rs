//! Rolling per-container log buffer and the fetch cursor.
//!
//! Lines arrive as `"<RFC3339 timestamp> <message>"`. A line whose
//! timestamp does not parse is still buffered and filterable; it just
//! cannot advance the cursor.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// Bounded ordered sequence of raw log lines. Oldest lines fall off
/// the front when capacity is exceeded.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Vec<String>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Vec::new(),
            capacity,
        }
    }

    pub fn extend(&mut self, lines: Vec<String>) {
        self.lines.extend(lines);
        if self.lines.len() > self.capacity {
            let excess = self.lines.len() - self.capacity;
            self.lines.drain(..excess);
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drop the lines that were folded into an emitted event so they
    /// can never be aggregated twice.
    pub fn remove_indices(&mut self, consumed: &HashSet<usize>) {
        if consumed.is_empty() {
            return;
        }
        let mut index = 0;
        self.lines.retain(|_| {
            let keep = !consumed.contains(&index);
            index += 1;
            keep
        });
    }
}

/// Per (source, container) state: the rolling buffer plus the
/// high-water mark of consumed log time.
#[derive(Debug)]
pub struct ContainerState {
    pub buffer: LogBuffer,
    pub cursor: Option<DateTime<Utc>>,
}

impl ContainerState {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            cursor: None,
        }
    }

    /// Advance the cursor to the newest parseable timestamp in the
    /// fetched batch, falling back to `now` when nothing parses (so the
    /// same window is never re-read forever). Never moves backwards.
    pub fn advance_cursor(&mut self, lines: &[String], now: DateTime<Utc>) {
        if lines.is_empty() {
            return;
        }
        let newest = lines
            .iter()
            .rev()
            .find_map(|l| parse_timestamp(l))
            .unwrap_or(now);
        self.cursor = Some(match self.cursor {
            Some(current) => current.max(newest),
            None => newest,
        });
    }
}

/// Parse the leading RFC3339 timestamp token of a raw log line.
pub fn parse_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let token = line.split_whitespace().next()?;
    DateTime::parse_from_rfc3339(token)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Strip the timestamp prefix (everything up to the first space).
pub fn strip_timestamp(line: &str) -> &str {
    line.split_once(' ').map(|(_, rest)| rest).unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ── LogBuffer ────────────────────────────────────────────────

    #[test]
    fn test_buffer_drops_oldest_on_overflow() {
        let mut buffer = LogBuffer::new(3);
        buffer.extend(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        assert_eq!(buffer.as_slice(), ["b", "c", "d"]);
    }

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let mut buffer = LogBuffer::new(10);
        for _ in 0..20 {
            buffer.extend(vec!["x".into(); 7]);
            assert!(buffer.len() <= 10);
        }
    }

    #[test]
    fn test_remove_indices_keeps_order() {
        let mut buffer = LogBuffer::new(10);
        buffer.extend(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        let consumed: HashSet<usize> = [1, 2].into_iter().collect();
        buffer.remove_indices(&consumed);
        assert_eq!(buffer.as_slice(), ["a", "d"]);
    }

    // ── Timestamp parsing ────────────────────────────────────────

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let ts = parse_timestamp("2024-01-01T00:00:07Z ERROR boom");
        assert_eq!(ts, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 7).unwrap()));
    }

    #[test]
    fn test_parse_timestamp_nanoseconds_offset() {
        // Docker emits RFC3339Nano with an offset.
        let ts = parse_timestamp("2024-01-01T08:00:00.123456789+08:00 WARN x");
        assert_eq!(
            ts.map(|t| t.timestamp()),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp())
        );
    }

    #[test]
    fn test_parse_timestamp_garbage_is_none() {
        assert_eq!(parse_timestamp("not-a-timestamp ERROR"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_strip_timestamp() {
        assert_eq!(strip_timestamp("2024-01-01T00:00:00Z ERROR x"), "ERROR x");
        assert_eq!(strip_timestamp("no-space-line"), "no-space-line");
    }

    // ── Cursor ───────────────────────────────────────────────────

    #[test]
    fn test_cursor_monotonic() {
        let mut state = ContainerState::new(LogBuffer::new(10));
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        state.advance_cursor(&["2024-01-01T00:30:00Z a".into()], now);
        let first = state.cursor.unwrap();
        // An older batch must not rewind the cursor.
        state.advance_cursor(&["2024-01-01T00:10:00Z b".into()], now);
        assert_eq!(state.cursor.unwrap(), first);
    }

    #[test]
    fn test_cursor_skips_unparseable_tail() {
        let mut state = ContainerState::new(LogBuffer::new(10));
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        state.advance_cursor(
            &["2024-01-01T00:30:00Z a".into(), "trailing garbage".into()],
            now,
        );
        assert_eq!(
            state.cursor,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap())
        );
    }
}
