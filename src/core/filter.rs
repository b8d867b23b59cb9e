//! Assembly name filter
//!
//! Decides which assembly references propagation and readiness checks consider.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::FilterError;

/// How patterns select references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Only references matching some pattern are included
    #[default]
    MatchOnly,
    /// References matching any pattern are excluded
    ExcludeMatching,
}

impl FilterMode {
    pub fn from_flip(flip: bool) -> Self {
        if flip {
            Self::ExcludeMatching
        } else {
            Self::MatchOnly
        }
    }
}

/// Case-insensitive, unanchored regex filter over declared assembly names
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    patterns: Vec<Regex>,
    mode: FilterMode,
}

impl NameFilter {
    pub fn new(patterns: &[String], mode: FilterMode) -> Result<Self, FilterError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| FilterError::InvalidPattern {
                        pattern: pattern.clone(),
                        error: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns, mode })
    }

    /// Filter that includes everything
    pub fn include_all() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    pub fn includes(&self, name: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let matched = self.patterns.iter().any(|p| p.is_match(name));
        match self.mode {
            FilterMode::MatchOnly => matched,
            FilterMode::ExcludeMatching => !matched,
        }
    }
}

impl fmt::Display for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns = self
            .patterns()
            .map(|p| format!("'{p}'"))
            .collect::<Vec<_>>()
            .join(", ");
        match self.mode {
            FilterMode::MatchOnly => write!(f, "did not match any of the patterns: {patterns}"),
            FilterMode::ExcludeMatching => {
                write!(f, "matched one or more of the patterns: {patterns}")
            }
        }
    }
}
