//! Attribution of missed lines to structural blocks.
//!
//! Missed lines are grouped into runs; each run becomes exactly one [`Gap`]
//! attributed to the smallest block containing it. Because runs partition the
//! missed set, gaps of one file never overlap and together cover every missed
//! line.

use std::collections::BTreeSet;

use tracing::trace;

use super::blocks::{ClassifiedFile, MODULE_BLOCK};
use super::report::FileCoverage;
use super::types::{BlockType, Gap};

/// Groups missed lines and resolves nesting between candidate blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct GapAggregator;

impl GapAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Maximal runs of missed lines. Adjacent missed lines stay together
    /// unless a function body closes between them. Across unlisted lines
    /// (blank lines, comments, `else:`) a run continues only while no block
    /// boundary lies in between, and an executed or excluded line always
    /// ends it.
    pub fn runs(file: &ClassifiedFile, coverage: &FileCoverage) -> Vec<Vec<usize>> {
        let mut runs: Vec<Vec<usize>> = Vec::new();
        let mut previous: Option<usize> = None;

        for &line in &coverage.missed {
            let split = previous.map_or(true, |prev| Self::splits(file, coverage, prev, line));
            match runs.last_mut() {
                Some(run) if !split => run.push(line),
                _ => runs.push(vec![line]),
            }
            previous = Some(line);
        }
        runs
    }

    /// One gap per missed run of `file`.
    pub fn aggregate(&self, path: &str, file: &ClassifiedFile, coverage: &FileCoverage) -> Vec<Gap> {
        Self::runs(file, coverage)
            .into_iter()
            .map(|run| self.gap_for_run(path, file, run))
            .collect()
    }

    /// Whether successive missed lines `prev < line` fall in different runs.
    fn splits(file: &ClassifiedFile, coverage: &FileCoverage, prev: usize, line: usize) -> bool {
        if (prev + 1..line).any(|between| coverage.is_barrier(between)) {
            return true;
        }

        let adjacent = line == prev + 1;
        let index = file.index();

        let mut left = index
            .chain(prev)
            .iter()
            .filter(|&&id| id != MODULE_BLOCK)
            .map(|&id| file.block(id))
            .filter(|block| !block.contains(line));
        let left_function = left
            .clone()
            .any(|block| block.block_type == BlockType::FunctionBody);
        if left_function || (!adjacent && left.next().is_some()) {
            return true;
        }

        // Entering a body across unlisted lines needs its header on `prev`.
        !adjacent
            && index
                .chain(line)
                .iter()
                .filter(|&&id| id != MODULE_BLOCK)
                .map(|&id| file.block(id))
                .filter(|block| !block.contains(prev))
                .any(|block| !block.header_line.is_some_and(|header| header <= prev))
    }

    fn gap_for_run(&self, path: &str, file: &ClassifiedFile, run: Vec<usize>) -> Gap {
        let selection = self.selection(file, &run);
        let block_id = self.select_block(file, &selection);
        let block = file.block(block_id).clone();

        trace!(
            file = path,
            start = run[0],
            block = %block.block_type,
            "attributed missed run"
        );

        let missed_lines: BTreeSet<usize> = run.into_iter().collect();
        Gap {
            file: path.to_string(),
            block_type: block.block_type,
            line_start: missed_lines.first().copied().unwrap_or(block.line_start),
            line_end: missed_lines.last().copied().unwrap_or(block.line_end),
            owning_function: block.owner.as_ref().map(|o| o.qualified_name.clone()),
            missed_lines,
            block,
        }
    }

    /// Run lines that pin the attribution. A header line is dropped when the
    /// body it introduces holds another line of the same run.
    fn selection(&self, file: &ClassifiedFile, run: &[usize]) -> Vec<usize> {
        let selected: Vec<usize> = run
            .iter()
            .copied()
            .filter(|&line| {
                !file.index().headed_at(line).iter().any(|&id| {
                    let block = file.block(id);
                    run.iter().any(|&other| other != line && block.contains(other))
                })
            })
            .collect();

        if selected.is_empty() {
            run.to_vec()
        } else {
            selected
        }
    }

    /// Smallest block containing every selected line; ties go to the higher
    /// rank, then to the innermost block.
    fn select_block(&self, file: &ClassifiedFile, selection: &[usize]) -> usize {
        let (Some(&lo), Some(&hi)) = (selection.iter().min(), selection.iter().max()) else {
            return MODULE_BLOCK;
        };

        file.index()
            .chain(lo)
            .iter()
            .enumerate()
            .filter(|&(_, &id)| file.block(id).contains(hi))
            .min_by(|&(depth_a, &a), &(depth_b, &b)| {
                let (a, b) = (file.block(a), file.block(b));
                a.span_len()
                    .cmp(&b.span_len())
                    .then(b.block_type.rank().cmp(&a.block_type.rank()))
                    .then(depth_b.cmp(&depth_a))
            })
            .map(|(_, &id)| id)
            .unwrap_or(MODULE_BLOCK)
    }
}
