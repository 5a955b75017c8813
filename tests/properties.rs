//! Property tests: gaps partition the missed lines of a file.

use std::collections::BTreeSet;

use code_covered::{FileCoverage, GapEngine, Priority};
use proptest::prelude::*;

const SOURCE: &str = "\
import os

class Store:
    def __init__(self, root):
        self.root = root

    def load(self, key):
        path = os.path.join(self.root, key)
        try:
            with open(path) as handle:
                return handle.read()
        except FileNotFoundError:
            return None
        except OSError as exc:
            raise RuntimeError(path) from exc

def scan(items, limit):
    seen = 0
    for item in items:
        if item is None:
            continue
        elif item < 0:
            raise ValueError(item)
        else:
            seen += 1
        while seen > limit:
            seen -= 1
    return seen

async def poll(client):
    match client.status:
        case \"ok\":
            return True
        case _:
            return False

if __name__ == \"__main__\":
    print(scan([1, 2], 5))
";

const LINES: usize = 42;

/// Each line is executed, missed or unlisted.
fn coverage_strategy() -> impl Strategy<Value = FileCoverage> {
    prop::collection::vec(0u8..3, LINES + 3).prop_map(|states| {
        let mut executed = BTreeSet::new();
        let mut missed = BTreeSet::new();
        for (idx, state) in states.into_iter().enumerate() {
            match state {
                0 => {
                    executed.insert(idx + 1);
                }
                1 => {
                    missed.insert(idx + 1);
                }
                _ => {}
            }
        }
        FileCoverage::new(executed, missed, [])
    })
}

proptest! {
    #[test]
    fn gaps_partition_missed_lines(coverage in coverage_strategy()) {
        let engine = GapEngine::with_defaults().unwrap();
        let gaps = engine
            .gaps_for_source("store.py", SOURCE.to_string(), &coverage)
            .unwrap();

        let mut union = BTreeSet::new();
        for gap in &gaps {
            prop_assert!(!gap.missed_lines.is_empty());
            for line in &gap.missed_lines {
                prop_assert!(union.insert(*line), "line {} in two gaps", line);
            }
        }
        prop_assert_eq!(&union, &coverage.missed);

        for pair in gaps.windows(2) {
            prop_assert!(pair[0].line_end < pair[1].line_start);
        }
    }

    #[test]
    fn suggestions_are_deterministic_and_sorted(coverage in coverage_strategy()) {
        let engine = GapEngine::with_defaults().unwrap();
        let first = engine
            .analyze_source("store.py", SOURCE.to_string(), &coverage)
            .unwrap();
        let second = engine
            .analyze_source("store.py", SOURCE.to_string(), &coverage)
            .unwrap();
        prop_assert_eq!(&first, &second);

        let names: BTreeSet<&str> = first.iter().map(|s| s.test_name.as_str()).collect();
        prop_assert_eq!(names.len(), first.len());

        for s in &first {
            prop_assert!(s.test_name.starts_with("test_"));
            prop_assert!(s.priority >= Priority::Low);
            prop_assert!(s.covers_lines.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
