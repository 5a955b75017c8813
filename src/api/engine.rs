//! Gap analysis engine.
//!
//! [`GapEngine`] runs the per-file coverage pipeline over every file named in
//! a report. Files are independent: each one is read, parsed and analyzed
//! inside its own task, and a file that cannot be read or parsed becomes a
//! [`Warning`] without affecting the others.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::results::GapAnalysis;
use crate::core::config::CoveredConfig;
use crate::core::errors::{CoveredError, Result};
use crate::detectors::coverage::{
    CoverageGapDetector, CoverageReport, FileCoverage, Gap, Suggestion, Warning,
};
use crate::lang::python::{ParsedSource, PythonSourceIndex};

/// Maps a path as written in the coverage report to a file on disk.
pub trait SourceResolver: Sync {
    /// On-disk location of `report_path`
    fn resolve(&self, report_path: &str) -> PathBuf;
}

impl<F> SourceResolver for F
where
    F: Fn(&str) -> PathBuf + Sync,
{
    fn resolve(&self, report_path: &str) -> PathBuf {
        self(report_path)
    }
}

/// Resolves relative report paths against a root directory. Absolute paths are
/// used as they are.
#[derive(Debug, Clone)]
pub struct RootResolver {
    root: PathBuf,
}

impl RootResolver {
    /// Resolver rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolver rooted at the current directory
    pub fn current_dir() -> Self {
        Self::new(".")
    }
}

impl SourceResolver for RootResolver {
    fn resolve(&self, report_path: &str) -> PathBuf {
        let path = Path::new(report_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

enum FileOutcome {
    Analyzed(Vec<Suggestion>),
    Skipped(Warning),
    NotStarted,
}

/// Main gap analysis engine
#[derive(Debug, Clone)]
pub struct GapEngine {
    config: CoveredConfig,
    detector: CoverageGapDetector,
}

impl GapEngine {
    /// Create an engine; fails if the configuration is invalid
    pub fn new(config: CoveredConfig) -> Result<Self> {
        config.validate()?;
        let detector = CoverageGapDetector::new(&config.hints, config.templates.clone())?;
        Ok(Self { config, detector })
    }

    /// Engine with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(CoveredConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &CoveredConfig {
        &self.config
    }

    /// Validate a decoded report and analyze it. A malformed report is
    /// returned as an error before any source file is read.
    pub fn find_gaps_in_value<R>(&self, report: &Value, resolver: &R) -> Result<GapAnalysis>
    where
        R: SourceResolver + ?Sized,
    {
        let report = CoverageReport::from_value(report)?;
        Ok(self.find_gaps(&report, resolver))
    }

    /// Analyze every file of `report`.
    pub fn find_gaps<R>(&self, report: &CoverageReport, resolver: &R) -> GapAnalysis
    where
        R: SourceResolver + ?Sized,
    {
        self.find_gaps_with_cancel(report, resolver, &CancellationToken::new())
    }

    /// Analyze every file of `report` until `cancel` fires. Files already
    /// finished are kept; files not yet started are dropped without a warning.
    pub fn find_gaps_with_cancel<R>(
        &self,
        report: &CoverageReport,
        resolver: &R,
        cancel: &CancellationToken,
    ) -> GapAnalysis
    where
        R: SourceResolver + ?Sized,
    {
        if report.is_empty() {
            debug!("coverage report names no files");
            return GapAnalysis::empty();
        }

        info!(
            files = report.len(),
            missed_lines = report.missed_line_count(),
            parallel = self.config.analysis.parallel,
            "starting gap analysis"
        );

        let files: Vec<(&str, &FileCoverage)> = report.files().collect();
        let task = |&(path, coverage): &(&str, &FileCoverage)| {
            if cancel.is_cancelled() {
                return FileOutcome::NotStarted;
            }
            self.analyze_file(path, coverage, resolver)
        };
        let outcomes: Vec<FileOutcome> = if self.config.analysis.parallel {
            files.par_iter().map(task).collect()
        } else {
            files.iter().map(task).collect()
        };

        let mut analysis = GapAnalysis::empty();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Analyzed(suggestions) => analysis.suggestions.extend(suggestions),
                FileOutcome::Skipped(warning) => analysis.warnings.push(warning),
                FileOutcome::NotStarted => analysis.cancelled = true,
            }
        }
        if cancel.is_cancelled() {
            analysis.cancelled = true;
        }

        sort_suggestions(&mut analysis.suggestions);
        analysis
            .warnings
            .sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.message.cmp(&b.message)));

        info!(
            suggestions = analysis.suggestions.len(),
            warnings = analysis.warnings.len(),
            cancelled = analysis.cancelled,
            "gap analysis finished"
        );
        analysis
    }

    /// Suggestions for one in-memory source, bypassing file resolution.
    pub fn analyze_source(
        &self,
        path: &str,
        text: String,
        coverage: &FileCoverage,
    ) -> Result<Vec<Suggestion>> {
        let source = parse_source(path, text)?;
        Ok(self.detector.suggest(&source, coverage))
    }

    /// Gaps (before prioritization and templating) for one in-memory source.
    pub fn gaps_for_source(
        &self,
        path: &str,
        text: String,
        coverage: &FileCoverage,
    ) -> Result<Vec<Gap>> {
        let source = parse_source(path, text)?;
        Ok(self.detector.gaps(&source, coverage))
    }

    fn analyze_file<R>(&self, path: &str, coverage: &FileCoverage, resolver: &R) -> FileOutcome
    where
        R: SourceResolver + ?Sized,
    {
        if coverage.missed.is_empty() {
            debug!(file = path, "no missed lines");
            return FileOutcome::Analyzed(Vec::new());
        }

        let location = resolver.resolve(path);
        match self.load_and_suggest(path, &location, coverage) {
            Ok(suggestions) => {
                debug!(file = path, suggestions = suggestions.len(), "analyzed file");
                FileOutcome::Analyzed(suggestions)
            }
            Err(err) => {
                warn!(file = path, error = %err, per_file = err.is_per_file(), "skipping file");
                FileOutcome::Skipped(Warning::new(path, err.to_string()))
            }
        }
    }

    fn load_and_suggest(
        &self,
        path: &str,
        location: &Path,
        coverage: &FileCoverage,
    ) -> Result<Vec<Suggestion>> {
        let text = std::fs::read_to_string(location).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                CoveredError::missing_file(location)
            } else {
                CoveredError::io(format!("Failed to read {}", location.display()), err)
            }
        })?;
        let source = parse_source(path, text)?;
        Ok(self.detector.suggest(&source, coverage))
    }
}

fn parse_source(path: &str, text: String) -> Result<ParsedSource> {
    let mut index = PythonSourceIndex::new()?;
    index.parse(path, text)
}

/// Priority descending, then file and first line ascending.
pub fn sort_suggestions(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line_start.cmp(&b.line_start))
    });
}

/// Analyze a decoded report with the default configuration.
pub fn find_gaps<R>(report: &Value, resolver: &R) -> Result<GapAnalysis>
where
    R: SourceResolver + ?Sized,
{
    GapEngine::with_defaults()?.find_gaps_in_value(report, resolver)
}
