//! Analysis results returned by the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detectors::coverage::{Priority, Suggestion, Warning};

/// Outcome of one gap analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapAnalysis {
    /// Test suggestions ordered by priority (descending), file, then line
    pub suggestions: Vec<Suggestion>,

    /// One warning per skipped file, ordered by file
    pub warnings: Vec<Warning>,

    /// Set when the run was cancelled before every file was started
    #[serde(default)]
    pub cancelled: bool,
}

/// Counts per priority tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapSummary {
    /// Number of suggestions per tier
    pub by_priority: BTreeMap<Priority, usize>,

    /// Distinct files with at least one suggestion
    pub files_with_gaps: usize,

    /// Missed lines covered by all suggestions
    pub missed_lines: usize,

    /// Files skipped with a warning
    pub skipped_files: usize,
}

impl GapAnalysis {
    /// Empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// No suggestions and no warnings
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty() && self.warnings.is_empty()
    }

    /// Suggestions for one file, in result order
    pub fn suggestions_for<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Suggestion> + 'a {
        self.suggestions.iter().filter(move |s| s.file == file)
    }

    /// Aggregate counts
    pub fn summary(&self) -> GapSummary {
        let mut by_priority = BTreeMap::new();
        let mut files = std::collections::BTreeSet::new();
        let mut missed_lines = 0;
        for suggestion in &self.suggestions {
            *by_priority.entry(suggestion.priority).or_insert(0) += 1;
            files.insert(suggestion.file.as_str());
            missed_lines += suggestion.covers_lines.len();
        }
        GapSummary {
            by_priority,
            files_with_gaps: files.len(),
            missed_lines,
            skipped_files: self.warnings.len(),
        }
    }
}
