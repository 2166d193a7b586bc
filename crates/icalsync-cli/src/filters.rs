//! Title filters applied to the feed before it is mirrored.

use icalsync_core::{FeedEvent, FeedHooks};
use regex::{Regex, RegexBuilder};

/// Keeps feed events by title.
///
/// An event is kept when it matches any include pattern (or there are none)
/// and matches no exclude pattern. Patterns are case-insensitive regexes;
/// events without a title are matched against the empty string.
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    skip_all_day: bool,
}

impl TitleFilter {
    /// Compiles the include and exclude patterns.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, String> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            skip_all_day: false,
        })
    }

    /// Builder: also drop all-day events.
    pub fn with_skip_all_day(mut self, skip: bool) -> Self {
        self.skip_all_day = skip;
        self
    }

    /// Returns true if the filter keeps every event.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && !self.skip_all_day
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, String> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| format!("invalid title pattern '{}': {}", p, e))
        })
        .collect()
}

impl FeedHooks for TitleFilter {
    fn keep(&self, event: &FeedEvent) -> bool {
        if self.skip_all_day && event.is_all_day() {
            return false;
        }
        let title = event.name.as_deref().unwrap_or_default();
        (self.include.is_empty() || self.include.iter().any(|r| r.is_match(title)))
            && !self.exclude.iter().any(|r| r.is_match(title))
    }
}
