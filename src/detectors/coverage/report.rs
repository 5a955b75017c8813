//! Normalized line coverage.
//!
//! Accepts the decoded JSON export of coverage.py (`{"files": {path: {...}}}`)
//! or a bare `{path: {...}}` mapping, and keeps per file the executed, missed
//! and excluded line sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::{CoveredError, Result};

const EXECUTED_KEYS: &[&str] = &["executed_lines", "executed"];
const MISSING_KEYS: &[&str] = &["missing_lines", "missing"];
const EXCLUDED_KEYS: &[&str] = &["excluded_lines", "excluded"];

/// Line sets of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    pub executed: BTreeSet<usize>,
    pub missed: BTreeSet<usize>,
    pub excluded: BTreeSet<usize>,
}

impl FileCoverage {
    pub fn new(
        executed: impl IntoIterator<Item = usize>,
        missed: impl IntoIterator<Item = usize>,
        excluded: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            executed: executed.into_iter().collect(),
            missed: missed.into_iter().collect(),
            excluded: excluded.into_iter().collect(),
        }
    }

    /// Whether `line` separates two missed runs.
    pub fn is_barrier(&self, line: usize) -> bool {
        self.executed.contains(&line) || self.excluded.contains(&line)
    }
}

/// Coverage for every file named in a report, keyed by report path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, coverage: FileCoverage) {
        self.files.insert(path.into(), coverage);
    }

    pub fn get(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    /// Files in ascending path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileCoverage)> {
        self.files.iter().map(|(path, coverage)| (path.as_str(), coverage))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total number of missed lines across all files.
    pub fn missed_line_count(&self) -> usize {
        self.files.values().map(|c| c.missed.len()).sum()
    }

    /// Parse report JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).map_err(|err| {
            CoveredError::malformed_report(format!("report is not valid JSON: {err}"))
        })?;
        Self::from_value(&value)
    }

    /// Normalize a decoded report.
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| CoveredError::malformed_report("report root must be an object"))?;

        let files = match root.get("files") {
            Some(Value::Object(files)) => files,
            Some(_) => {
                return Err(CoveredError::malformed_report_at(
                    "expected an object keyed by file path",
                    "files",
                ))
            }
            None => root,
        };

        let mut report = Self::new();
        for (path, entry) in files {
            let entry = entry.as_object().ok_or_else(|| {
                CoveredError::malformed_report_at("file entry must be an object", path.as_str())
            })?;
            report.insert(path.clone(), parse_file_entry(path, entry)?);
        }
        Ok(report)
    }
}

fn parse_file_entry(path: &str, entry: &Map<String, Value>) -> Result<FileCoverage> {
    let missed = required_lines(path, entry, MISSING_KEYS)?;
    let executed = required_lines(path, entry, EXECUTED_KEYS)?;
    let excluded = match lookup(entry, EXCLUDED_KEYS) {
        Some((key, value)) => parse_lines(path, key, value)?,
        None => BTreeSet::new(),
    };

    Ok(FileCoverage {
        executed,
        missed,
        excluded,
    })
}

fn lookup<'a>(entry: &'a Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|&key| entry.get(key).map(|value| (key, value)))
}

fn required_lines(
    path: &str,
    entry: &Map<String, Value>,
    keys: &[&'static str],
) -> Result<BTreeSet<usize>> {
    let (key, value) = lookup(entry, keys).ok_or_else(|| {
        CoveredError::malformed_report_at(
            format!("missing required field '{}'", keys[0]),
            format!("{path}.{}", keys[0]),
        )
    })?;
    parse_lines(path, key, value)
}

fn parse_lines(path: &str, key: &str, value: &Value) -> Result<BTreeSet<usize>> {
    let items = value.as_array().ok_or_else(|| {
        CoveredError::malformed_report_at("expected an array of line numbers", format!("{path}.{key}"))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_u64()
                .filter(|&line| line > 0)
                .map(|line| line as usize)
                .ok_or_else(|| {
                    CoveredError::malformed_report_at(
                        format!("invalid line number {item}"),
                        format!("{path}.{key}"),
                    )
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_coverage_py_shape() {
        let value = json!({
            "meta": {"version": "7.4.0"},
            "files": {
                "pkg/a.py": {
                    "executed_lines": [1, 2, 5],
                    "missing_lines": [4, 3, 3],
                    "excluded_lines": [6],
                    "summary": {"covered_lines": 3}
                }
            },
            "totals": {}
        });
        let report = CoverageReport::from_value(&value).unwrap();
        let file = report.get("pkg/a.py").unwrap();
        assert_eq!(file.missed.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
        assert!(file.is_barrier(5));
        assert!(file.is_barrier(6));
        assert!(!file.is_barrier(7));
    }

    #[test]
    fn accepts_bare_mapping_and_aliases() {
        let value = json!({"m.py": {"executed": [1], "missing": [2]}});
        let report = CoverageReport::from_value(&value).unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.get("m.py").unwrap().excluded.is_empty());
    }

    #[test]
    fn empty_files_is_empty_report() {
        let report = CoverageReport::from_value(&json!({"files": {}})).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.missed_line_count(), 0);
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let value = json!({"files": {"a.py": {"executed_lines": [1]}}});
        let err = CoverageReport::from_value(&value).unwrap_err();
        match err {
            CoveredError::MalformedReport { field, .. } => {
                assert_eq!(field.as_deref(), Some("a.py.missing_lines"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_positive_lines_are_malformed() {
        let value = json!({"files": {"a.py": {"executed_lines": [], "missing_lines": [0]}}});
        assert!(matches!(
            CoverageReport::from_value(&value),
            Err(CoveredError::MalformedReport { .. })
        ));
    }

    #[test]
    fn non_object_root_is_malformed() {
        assert!(CoverageReport::from_value(&json!([1, 2])).is_err());
        assert!(CoverageReport::from_value(&json!({"files": []})).is_err());
        assert!(CoverageReport::from_json_str("{not json").is_err());
    }
}
