//! Error fingerprinting for deduplication.
//!
//! Two log lines that differ only in embedded numbers, ids, or
//! timestamps must collapse to the same fingerprint: hex-looking runs
//! of 8+ characters become `HASH`, then digit runs become `X`.

use std::sync::OnceLock;

use regex::Regex;

/// Fingerprints keep at most this many message characters.
const MAX_KEY_CHARS: usize = 100;

fn hex_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-f0-9]{8,}").expect("static pattern"))
}

fn digit_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static pattern"))
}

/// Normalised message identity: timestamp prefix dropped, hex runs and
/// digit runs masked, trimmed, capped at 100 chars.
pub fn normalize_message(line: &str) -> String {
    let message = line.split_once(' ').map(|(_, m)| m).unwrap_or(line);
    let masked = hex_pattern().replace_all(message, "HASH");
    let masked = digit_pattern().replace_all(&masked, "X");
    masked.trim().chars().take(MAX_KEY_CHARS).collect()
}

/// Fingerprint scoped by container name only (local sources).
pub fn error_key(container: &str, line: &str) -> String {
    format!("{container}:{}", normalize_message(line))
}

/// Fingerprint optionally scoped by a server label (remote sources).
/// Local fingerprints deliberately stay container-scoped; no global
/// uniqueness across sources is guaranteed.
pub fn scoped_error_key(scope: Option<&str>, container: &str, line: &str) -> String {
    match scope {
        Some(server) => format!("{server}:{}", error_key(container, line)),
        None => error_key(container, line),
    }
}
