//! End-to-end engine behavior over sources on disk.

use std::fs;
use std::path::{Path, PathBuf};

use code_covered::{
    BlockType, CancellationToken, CoverageReport, CoveredConfig, CoveredError, FileCoverage,
    GapEngine, Priority, RootResolver,
};
use serde_json::json;
use tempfile::tempdir;

fn write(root: &Path, name: &str, text: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn engine() -> GapEngine {
    GapEngine::with_defaults().unwrap()
}

const VALIDATOR: &str = "\
def positive(x):
    if x > 0:
        return 1
    else:
        raise ValueError()
";

const LOOP_RAISE: &str = "\
def check_all(items):
    for item in items:
        if item is None:
            raise TypeError(\"None in items\")
    return True
";

#[test]
fn raise_in_else_arm_is_single_critical_gap() {
    let dir = tempdir().unwrap();
    write(dir.path(), "validator.py", VALIDATOR);

    let mut report = CoverageReport::new();
    report.insert("validator.py", FileCoverage::new([1, 2, 3], [5], []));
    let analysis = engine().find_gaps(&report, &RootResolver::new(dir.path()));

    assert!(analysis.warnings.is_empty());
    assert_eq!(analysis.suggestions.len(), 1);
    let s = &analysis.suggestions[0];
    assert_eq!(s.block_type, BlockType::Raise);
    assert_eq!(s.priority, Priority::Critical);
    assert!(s.test_name.contains("raises"));
}

#[test]
fn missing_source_becomes_one_warning() {
    let dir = tempdir().unwrap();
    write(dir.path(), "validator.py", VALIDATOR);

    let report = json!({
        "files": {
            "missing.py": {"executed_lines": [1], "missing_lines": [2, 3]},
            "validator.py": {"executed_lines": [1, 2, 3], "missing_lines": [5]}
        }
    });
    let analysis = engine()
        .find_gaps_in_value(&report, &RootResolver::new(dir.path()))
        .unwrap();

    assert_eq!(analysis.warnings.len(), 1);
    assert_eq!(analysis.warnings[0].file, "missing.py");
    assert!(analysis.warnings[0].message.contains("missing.py"));
    assert_eq!(analysis.suggestions_for("missing.py").count(), 0);
    assert_eq!(analysis.suggestions_for("validator.py").count(), 1);
}

#[test]
fn fully_covered_file_yields_nothing() {
    let dir = tempdir().unwrap();
    write(dir.path(), "validator.py", VALIDATOR);

    let mut report = CoverageReport::new();
    report.insert("validator.py", FileCoverage::new([1, 2, 3, 5], [], []));
    let analysis = engine().find_gaps(&report, &RootResolver::new(dir.path()));
    assert!(analysis.is_empty());
}

#[test]
fn fully_covered_missing_file_is_not_read() {
    let mut report = CoverageReport::new();
    report.insert("nowhere.py", FileCoverage::new([1], [], []));
    let analysis = engine().find_gaps(&report, &RootResolver::new("/nonexistent"));
    assert!(analysis.is_empty());
}

#[test]
fn two_missed_arms_are_two_gaps() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "route.py",
        "\
def route(method):
    if method == \"GET\":
        return read()
    elif method == \"POST\":
        return write()
    return None
",
    );

    let mut report = CoverageReport::new();
    report.insert("route.py", FileCoverage::new([1, 2, 4, 6], [3, 5], []));
    let analysis = engine().find_gaps(&report, &RootResolver::new(dir.path()));

    assert_eq!(analysis.suggestions.len(), 2);
    assert!(analysis
        .suggestions
        .iter()
        .all(|s| s.block_type == BlockType::Branch && s.priority == Priority::High));
    assert_ne!(analysis.suggestions[0].test_name, analysis.suggestions[1].test_name);
}

#[test]
fn if_and_else_arms_missed_separately_are_two_gaps() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "lookup.py",
        "\
def lookup(table, key):
    try:
        if key in table:
            hit(key)

        else:
            # fall through to the default
            miss(key)
    except KeyError:
        pass
    return table
",
    );

    let mut report = CoverageReport::new();
    report.insert("lookup.py", FileCoverage::new([1, 2, 3, 9, 10, 11], [4, 8], []));
    let analysis = engine().find_gaps(&report, &RootResolver::new(dir.path()));

    assert_eq!(analysis.suggestions.len(), 2);
    let names: Vec<&str> = analysis
        .suggestions
        .iter()
        .map(|s| s.test_name.as_str())
        .collect();
    assert!(names.iter().any(|n| n.ends_with("_true")));
    assert!(names.iter().any(|n| n.ends_with("_false")));
    assert!(analysis
        .suggestions
        .iter()
        .all(|s| s.block_type == BlockType::Branch && s.priority == Priority::High));
}

#[test]
fn file_without_executed_lines_gives_gap_per_function() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "unused.py",
        "\
def check(x):
    if x is None:
        raise ValueError(x)
    return x


def double(x):
    y = x * 2
    return y
",
    );

    let report = json!({
        "files": {
            "unused.py": {"executed_lines": [], "missing_lines": [1, 2, 3, 4, 7, 8, 9]}
        }
    });
    let analysis = engine()
        .find_gaps_in_value(&report, &RootResolver::new(dir.path()))
        .unwrap();

    let found: Vec<(BlockType, usize, usize)> = analysis
        .suggestions
        .iter()
        .map(|s| (s.block_type, s.line_start, s.line_end))
        .collect();
    assert_eq!(
        found,
        vec![
            (BlockType::FunctionBody, 1, 4),
            (BlockType::FunctionBody, 7, 9),
        ]
    );
    assert!(analysis.suggestions.iter().all(|s| s.priority == Priority::Medium));
}

#[test]
fn nested_raise_collapses_to_one_gap() {
    let dir = tempdir().unwrap();
    write(dir.path(), "items.py", LOOP_RAISE);

    let mut report = CoverageReport::new();
    report.insert("items.py", FileCoverage::new([1, 5], [2, 3, 4], []));
    let analysis = engine().find_gaps(&report, &RootResolver::new(dir.path()));

    assert_eq!(analysis.suggestions.len(), 1);
    let s = &analysis.suggestions[0];
    assert_eq!(s.block_type, BlockType::Raise);
    assert_eq!(s.priority, Priority::Critical);
    assert_eq!(s.covers_lines, vec![2, 3, 4]);
    assert!(s.code_template.contains("pytest.raises(TypeError)"));
}

#[test]
fn syntax_error_becomes_warning_and_run_continues() {
    let dir = tempdir().unwrap();
    write(dir.path(), "broken.py", "def broken(:\n    pass\n");
    write(dir.path(), "validator.py", VALIDATOR);

    let mut report = CoverageReport::new();
    report.insert("broken.py", FileCoverage::new([], [2], []));
    report.insert("validator.py", FileCoverage::new([1, 2, 3], [5], []));
    let analysis = engine().find_gaps(&report, &RootResolver::new(dir.path()));

    assert_eq!(analysis.warnings.len(), 1);
    assert_eq!(analysis.warnings[0].file, "broken.py");
    assert!(analysis.warnings[0].message.contains("Parse error"));
    assert_eq!(analysis.suggestions.len(), 1);
}

#[test]
fn ordering_is_priority_then_file_then_line() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "b.py",
        "\
def work(xs):
    total = 0
    for x in xs:
        total += x
    try:
        return total / len(xs)
    except ZeroDivisionError:
        return 0
",
    );
    write(dir.path(), "a.py", VALIDATOR);
    write(dir.path(), "pkg/c.py", "import os\nHOME = os.environ.get(\"HOME\")\n");
    write(
        dir.path(),
        "d.py",
        "def flag(x):\n    if x:\n        return True\n    return False\n",
    );

    let mut report = CoverageReport::new();
    report.insert("b.py", FileCoverage::new([1, 2, 3, 5, 6], [4, 8], []));
    report.insert("a.py", FileCoverage::new([1, 2, 3], [5], []));
    report.insert("pkg/c.py", FileCoverage::new([1], [2], []));
    report.insert("d.py", FileCoverage::new([1, 2, 4], [3], []));
    let analysis = engine().find_gaps(&report, &RootResolver::new(dir.path()));

    let order: Vec<(Priority, &str, usize)> = analysis
        .suggestions
        .iter()
        .map(|s| (s.priority, s.file.as_str(), s.line_start))
        .collect();
    assert_eq!(
        order,
        vec![
            (Priority::Critical, "a.py", 5),
            (Priority::Critical, "b.py", 8),
            (Priority::High, "d.py", 3),
            (Priority::Medium, "b.py", 4),
            (Priority::Low, "pkg/c.py", 2),
        ]
    );
}

#[test]
fn repeated_runs_are_identical() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.py", VALIDATOR);
    write(dir.path(), "items.py", LOOP_RAISE);

    let mut report = CoverageReport::new();
    report.insert("a.py", FileCoverage::new([1, 2], [3, 5], []));
    report.insert("items.py", FileCoverage::new([1, 5], [2, 3, 4], []));

    let parallel = engine().find_gaps(&report, &RootResolver::new(dir.path()));
    let again = engine().find_gaps(&report, &RootResolver::new(dir.path()));

    let mut config = CoveredConfig::default();
    config.analysis.parallel = false;
    let sequential = GapEngine::new(config)
        .unwrap()
        .find_gaps(&report, &RootResolver::new(dir.path()));

    let first = serde_json::to_string(&parallel).unwrap();
    assert_eq!(first, serde_json::to_string(&again).unwrap());
    assert_eq!(first, serde_json::to_string(&sequential).unwrap());
}

#[test]
fn malformed_report_processes_no_files() {
    let reads = std::sync::atomic::AtomicUsize::new(0);
    let resolver = |path: &str| {
        reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        PathBuf::from(path)
    };
    let report = json!({
        "files": {
            "a.py": {"executed_lines": [1], "missing_lines": [2]},
            "b.py": {"executed_lines": "oops", "missing_lines": [2]}
        }
    });
    let err = engine().find_gaps_in_value(&report, &resolver).unwrap_err();
    assert!(matches!(err, CoveredError::MalformedReport { .. }));
    assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn empty_report_is_not_an_error() {
    let analysis = code_covered::find_gaps(&json!({"files": {}}), &RootResolver::new("."))
        .unwrap();
    assert!(analysis.suggestions.is_empty());
    assert!(analysis.warnings.is_empty());
}

#[test]
fn cancelled_run_starts_no_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.py", VALIDATOR);

    let mut report = CoverageReport::new();
    report.insert("a.py", FileCoverage::new([1, 2], [3, 5], []));
    report.insert("gone.py", FileCoverage::new([1], [2], []));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let analysis =
        engine().find_gaps_with_cancel(&report, &RootResolver::new(dir.path()), &cancel);

    assert!(analysis.cancelled);
    assert!(analysis.suggestions.is_empty());
    assert!(analysis.warnings.is_empty());
}

#[test]
fn closure_resolver_maps_report_paths() {
    let dir = tempdir().unwrap();
    write(dir.path(), "src/app/validator.py", VALIDATOR);
    let root = dir.path().join("src");

    let mut report = CoverageReport::new();
    report.insert("app/validator.py", FileCoverage::new([1, 2, 3], [5], []));
    let analysis = engine().find_gaps(&report, &|path: &str| root.join(path));

    assert_eq!(analysis.suggestions.len(), 1);
    assert_eq!(analysis.suggestions[0].file, "app/validator.py");
}
