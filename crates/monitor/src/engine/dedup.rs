//! Threshold / cooldown deduplication state machine.
//!
//! Occurrences during an active cooldown are counted but never
//! delivered; crossing the threshold outside cooldown fires exactly
//! once and resets the counter, so the same fingerprint must accumulate
//! `threshold` fresh occurrences before it can fire again.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct DedupEntry {
    /// Occurrences since the last notification (or first sighting).
    pub count: u32,
    pub last_notified: Option<DateTime<Utc>>,
}

/// Outcome of recording one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub notify: bool,
    /// The occurrence count at decision time (pre-reset when firing).
    pub count: u32,
}

#[derive(Debug, Default)]
pub struct DedupTable {
    entries: DashMap<String, DedupEntry>,
}

impl DedupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `key` at `now` and decide whether a
    /// notification fires.
    pub fn record(
        &self,
        key: &str,
        now: DateTime<Utc>,
        threshold: u32,
        cooldown: chrono::Duration,
    ) -> Decision {
        let mut entry = self.entries.entry(key.to_string()).or_default();

        if let Some(last) = entry.last_notified {
            if now - last < cooldown {
                entry.count += 1;
                return Decision {
                    notify: false,
                    count: entry.count,
                };
            }
        }

        entry.count += 1;
        if entry.count >= threshold {
            let fired = entry.count;
            entry.last_notified = Some(now);
            entry.count = 0;
            return Decision {
                notify: true,
                count: fired,
            };
        }
        Decision {
            notify: false,
            count: entry.count,
        }
    }

    /// Sweep idle entries older than `window`, then evict
    /// oldest-notified entries until at most `max_entries` remain.
    /// Entries that never notified sort oldest for eviction.
    pub fn cleanup(&self, now: DateTime<Utc>, window: chrono::Duration, max_entries: usize) {
        self.entries.retain(|_, entry| {
            let stale = entry
                .last_notified
                .map(|last| now - last > window)
                .unwrap_or(false);
            !(entry.count == 0 && stale)
        });

        let len = self.entries.len();
        if len > max_entries {
            let mut by_age: Vec<(String, DateTime<Utc>)> = self
                .entries
                .iter()
                .map(|r| {
                    (
                        r.key().clone(),
                        r.value().last_notified.unwrap_or(DateTime::<Utc>::MIN_UTC),
                    )
                })
                .collect();
            by_age.sort_by_key(|(_, last)| *last);
            for (key, _) in by_age.into_iter().take(len - max_entries) {
                self.entries.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn entry(&self, key: &str) -> Option<DedupEntry> {
        self.entries.get(key).map(|e| *e)
    }
}
