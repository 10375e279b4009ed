use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::trace::ThreadState;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Keep records with at least one matching audit line
    #[default]
    Include,
    /// Drop records with at least one matching audit line
    Exclude,
}

/// Record filter over the verbatim lines of each lifecycle.
pub struct FilterEngine {
    matcher: RegexMatcher,
    mode: FilterMode,
}

impl FilterEngine {
    pub fn new(pattern: &str, case_sensitive: bool, mode: FilterMode) -> Result<Self, FilterError> {
        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(!case_sensitive)
            .multi_line(false)
            .build(pattern)
            .map_err(|e| FilterError::InvalidRegex(e.to_string()))?;

        Ok(Self { matcher, mode })
    }

    #[inline]
    pub fn is_match(&self, line: &str) -> bool {
        self.matcher.is_match(line.as_bytes()).unwrap_or(false)
    }

    /// Decide over a set of lines: any match counts for the whole set.
    pub fn should_emit_any<'a, I>(&self, lines: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let matches = lines.into_iter().any(|line| self.is_match(line));
        match self.mode {
            FilterMode::Include => matches,
            FilterMode::Exclude => !matches,
        }
    }

    pub fn should_emit(&self, record: &ThreadState) -> bool {
        self.should_emit_any(record.raw_lines.iter().map(|(text, _)| text.as_str()))
    }
}
