//! Log line filter pipeline.
//!
//! Veto order (first veto wins): blacklisted container, blacklisted
//! keyword, blacklisted pattern, level gate, keyword gate. Empty level
//! or keyword lists fail open and match everything.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::conf::MonitorConfig;

pub struct FilterPipeline {
    /// Uppercased level tokens; empty = any level.
    levels: Vec<String>,
    /// Lowercased keywords; empty = any content.
    keywords: Vec<String>,
    blacklist_keywords: Vec<String>,
    blacklist_patterns: Vec<Regex>,
    blacklist_containers: HashSet<String>,
}

impl FilterPipeline {
    /// Compile the pipeline once at startup. Malformed blacklist
    /// patterns are logged and dropped, which makes them non-matching
    /// rather than fatal.
    pub fn new(config: &MonitorConfig) -> Self {
        let blacklist_patterns = config
            .blacklist
            .patterns
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(pattern = %pattern, error = %e, "ignoring malformed blacklist pattern");
                        None
                    }
                }
            })
            .collect();

        Self {
            levels: config.log_levels.iter().map(|l| l.to_uppercase()).collect(),
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
            blacklist_keywords: config
                .blacklist
                .keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            blacklist_patterns,
            blacklist_containers: config.blacklist.containers.iter().cloned().collect(),
        }
    }

    pub fn container_blacklisted(&self, container: &str) -> bool {
        self.blacklist_containers.contains(container)
    }

    /// Whether `line` from `container` qualifies for error processing.
    pub fn matches(&self, container: &str, line: &str) -> bool {
        if self.container_blacklisted(container) {
            return false;
        }

        let line_lower = line.to_lowercase();
        if self
            .blacklist_keywords
            .iter()
            .any(|k| line_lower.contains(k))
        {
            return false;
        }
        if self.blacklist_patterns.iter().any(|re| re.is_match(line)) {
            return false;
        }

        if !self.levels.is_empty() {
            let line_upper = line.to_uppercase();
            if !self.levels.iter().any(|level| line_upper.contains(level)) {
                return false;
            }
        }

        if !self.keywords.is_empty()
            && !self.keywords.iter().any(|k| line_lower.contains(k))
        {
            return false;
        }

        true
    }
}
