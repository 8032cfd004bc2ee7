#![forbid(unsafe_code)]

use regex::{Regex, RegexBuilder};

use crate::model::Entry;

/// Case-insensitive name filter. A pattern that does not compile yet (the
/// user is still typing) filters nothing.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pattern: String,
    regex: Option<Regex>,
}

impl EntryFilter {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let regex = if pattern.is_empty() {
            None
        } else {
            match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::debug!("ignoring incomplete filter '{}': {}", pattern, e);
                    None
                }
            }
        };
        Self { pattern, regex }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_active(&self) -> bool {
        !self.pattern.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.pattern.is_empty() || self.regex.is_some()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if entry.is_parent() {
            return true;
        }
        match &self.regex {
            Some(regex) => regex.is_match(&entry.name),
            None => true,
        }
    }

    pub fn apply<'a>(&self, entries: Vec<&'a Entry>) -> Vec<&'a Entry> {
        if self.regex.is_none() {
            return entries;
        }
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

impl PartialEq for EntryFilter {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}
