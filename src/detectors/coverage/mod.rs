//! Coverage gap detection: structural attribution of missed lines and test
//! suggestions built from it.
//!
//! Per file the pipeline is linear: classify blocks, aggregate missed runs
//! into gaps, assign a priority, detect hints (text rules plus structural
//! risks), synthesize a template.

pub mod aggregator;
pub mod blocks;
pub mod config;
pub mod hints;
pub mod priority;
pub mod report;
pub mod risks;
pub mod template;
pub mod types;

pub use aggregator::GapAggregator;
pub use blocks::{BlockClassifier, ClassifiedFile, LineIndex, ScopeChain};
pub use config::{HintConfig, TemplateConfig};
pub use hints::{HintDetector, HintRule};
pub use priority::{priority_for, priority_for_name, Priority};
pub use report::{CoverageReport, FileCoverage};
pub use risks::{Risk, RiskKind, RiskScanner};
pub use template::TemplateSynthesizer;
pub use types::*;

use indexmap::IndexSet;
use tracing::debug;

use crate::core::errors::Result;
use crate::lang::python::ParsedSource;


/// Runs the per-file pipeline over one parsed source.
#[derive(Debug, Clone)]
pub struct CoverageGapDetector {
    classifier: BlockClassifier,
    aggregator: GapAggregator,
    hints: HintDetector,
    /// `None` when structural hints are off
    risks: Option<RiskScanner>,
    templates: TemplateSynthesizer,
}

impl CoverageGapDetector {
    pub fn new(hints: &HintConfig, templates: TemplateConfig) -> Result<Self> {
        let risks = (hints.enabled && hints.structural)
            .then(|| RiskScanner::new(hints.complexity_threshold));
        Ok(Self {
            classifier: BlockClassifier::new(),
            aggregator: GapAggregator::new(),
            hints: HintDetector::from_config(hints)?,
            risks,
            templates: TemplateSynthesizer::new(templates),
        })
    }

    /// Gaps of one file in line order.
    pub fn gaps(&self, source: &ParsedSource, coverage: &FileCoverage) -> Vec<Gap> {
        if coverage.missed.is_empty() {
            return Vec::new();
        }
        let classified = self.classifier.classify(source);
        let gaps = self.aggregator.aggregate(source.path(), &classified, coverage);
        debug!(
            file = source.path(),
            blocks = classified.blocks().len(),
            gaps = gaps.len(),
            "aggregated coverage gaps"
        );
        gaps
    }

    /// Suggestions for one file, one per gap, in line order.
    pub fn suggest(&self, source: &ParsedSource, coverage: &FileCoverage) -> Vec<Suggestion> {
        let gaps = self.gaps(source, coverage);
        let risks = match (&self.risks, gaps.is_empty()) {
            (Some(scanner), false) => scanner.scan(source),
            _ => Vec::new(),
        };

        let enriched: Vec<(Gap, Priority, Vec<String>)> = gaps
            .into_iter()
            .map(|gap| {
                let priority = priority_for(gap.block_type);
                let hints = self.hints_for(source, &gap, &risks);
                (gap, priority, hints)
            })
            .collect();
        self.templates.synthesize_file(&enriched)
    }

    /// Text-rule hints for the gap's scope, then hints of the risks inside it.
    fn hints_for(&self, source: &ParsedSource, gap: &Gap, risks: &[Risk]) -> Vec<String> {
        let (start, end) = hint_scope(gap);
        let mut hints: IndexSet<String> = self
            .hints
            .detect(&source.lines(start, end))
            .into_iter()
            .collect();
        hints.extend(
            risks
                .iter()
                .filter(|risk| risk.overlaps(start, end))
                .map(Risk::hint),
        );
        hints.into_iter().collect()
    }
}

/// Lines searched for hints: the owning function or class, or the gap's own
/// lines at module level.
fn hint_scope(gap: &Gap) -> (usize, usize) {
    match &gap.block.owner {
        Some(owner) => (owner.line_start, owner.line_end),
        None => (gap.line_start, gap.line_end),
    }
}
