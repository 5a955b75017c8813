//! Rendering of analysis results: plain-text summary, JSON, and a pytest
//! module stitched together from suggestion templates.

use std::fmt::Write as _;

use crate::api::results::GapAnalysis;
use crate::core::errors::Result;
use crate::detectors::coverage::template::{module_stem, TestNames};
use crate::detectors::coverage::{Priority, Suggestion};

/// Output formats understood by [`render`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Pretty-printed [`GapAnalysis`]
    Json,
    /// Ready-to-edit pytest module
    Pytest,
}

/// Render `analysis` in the requested format
pub fn render(analysis: &GapAnalysis, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_summary(analysis)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(analysis)?),
        ReportFormat::Pytest => Ok(render_test_module(&analysis.suggestions)),
    }
}

/// Tier counts followed by one line per suggestion and one per warning.
pub fn render_summary(analysis: &GapAnalysis) -> String {
    let summary = analysis.summary();
    let mut out = String::new();

    if analysis.suggestions.is_empty() {
        out.push_str("No coverage gaps found.\n");
    } else {
        let _ = writeln!(
            out,
            "{} coverage gaps in {} files ({} missed lines)",
            analysis.suggestions.len(),
            summary.files_with_gaps,
            summary.missed_lines
        );
        let tiers: Vec<String> = [
            Priority::Critical,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ]
        .into_iter()
        .map(|tier| {
            let count = summary.by_priority.get(&tier).copied().unwrap_or(0);
            format!("{tier}: {count}")
        })
        .collect();
        let _ = writeln!(out, "  {}", tiers.join(", "));
        out.push('\n');

        for suggestion in &analysis.suggestions {
            let _ = writeln!(
                out,
                "[{:<8}] {}:{}-{} {} -> {}",
                suggestion.priority.as_str(),
                suggestion.file,
                suggestion.line_start,
                suggestion.line_end,
                suggestion.description,
                suggestion.test_name
            );
            for hint in &suggestion.hints {
                let _ = writeln!(out, "           hint: {hint}");
            }
        }
    }

    if !analysis.warnings.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{} files skipped:", analysis.warnings.len());
        for warning in &analysis.warnings {
            let _ = writeln!(out, "  {warning}");
        }
    }
    if analysis.cancelled {
        out.push_str("\nAnalysis was cancelled before all files were processed.\n");
    }
    out
}

/// A pytest module containing every suggestion's template, each preceded by a
/// comment naming the lines it covers.
///
/// Test names are only unique per source file, so a name already defined
/// earlier in the module is qualified with the source module stem
/// (`test_<stem>_...`), then numbered if it still collides.
pub fn render_test_module(suggestions: &[Suggestion]) -> String {
    let mut out = String::new();
    out.push_str("\"\"\"Tests generated from coverage gaps. Fill in the placeholders.\"\"\"\n\n");
    out.push_str("import pytest\n");

    let mut names = TestNames::new();
    for suggestion in suggestions {
        let name = if names.is_claimed(&suggestion.test_name) {
            names.claim(qualified_test_name(suggestion))
        } else {
            names.claim(suggestion.test_name.clone())
        };

        out.push_str("\n\n");
        let _ = writeln!(
            out,
            "# {}:{}-{} [{}] {}",
            suggestion.file,
            suggestion.line_start,
            suggestion.line_end,
            suggestion.priority,
            suggestion.description
        );
        let template = suggestion.code_template.trim_end();
        if name == suggestion.test_name {
            out.push_str(template);
        } else {
            out.push_str(&template.replacen(
                &format!("def {}(", suggestion.test_name),
                &format!("def {name}("),
                1,
            ));
        }
        out.push('\n');
    }
    out
}

fn qualified_test_name(suggestion: &Suggestion) -> String {
    let stem = module_stem(&suggestion.file);
    match suggestion.test_name.strip_prefix("test_") {
        Some(rest) => format!("test_{stem}_{rest}"),
        None => format!("test_{stem}_{}", suggestion.test_name),
    }
}
