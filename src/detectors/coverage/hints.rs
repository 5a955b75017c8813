//! Advisory setup hints.
//!
//! A hint rule maps a handful of literal patterns to one line of advice. Rules
//! are matched with a single Aho-Corasick automaton over the owning scope's
//! text; results are ordered by first occurrence and deduplicated. Hints never
//! affect which gaps exist or how they are ranked.

use aho_corasick::{AhoCorasick, MatchKind};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::config::HintConfig;
use crate::core::errors::{CoveredError, Result};

/// Literal patterns and the hint emitted when any of them occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRule {
    pub patterns: Vec<String>,
    pub hint: String,
}

impl HintRule {
    pub fn new<I, S>(patterns: I, hint: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            hint: hint.into(),
        }
    }
}

/// Rules shipped with the engine.
pub fn builtin_rules() -> Vec<HintRule> {
    vec![
        HintRule::new(
            [
                "requests.", "httpx.", "urllib", "aiohttp", "socket.", "http.client",
            ],
            "Mock network calls (e.g. responses, respx or unittest.mock.patch)",
        ),
        HintRule::new(
            ["await ", "async ", "asyncio."],
            "Async code: mark the test with @pytest.mark.asyncio",
        ),
        HintRule::new(
            ["random.", "uuid.", "secrets."],
            "Seed or patch random sources for deterministic results",
        ),
        HintRule::new(
            ["time.time", "time.sleep", "datetime.now", "datetime.utcnow", "date.today"],
            "Freeze or patch the clock (e.g. freezegun)",
        ),
        HintRule::new(
            ["open(", "pathlib", "Path(", "os.path", "shutil."],
            "Use the tmp_path fixture for filesystem access",
        ),
        HintRule::new(
            ["os.environ", "os.getenv"],
            "Set environment variables with monkeypatch.setenv",
        ),
        HintRule::new(
            ["subprocess.", "os.system", "os.popen"],
            "Patch subprocess calls instead of spawning processes",
        ),
        HintRule::new(
            ["sqlite3", "cursor.execute", "session.query", "psycopg", "sqlalchemy"],
            "Use an in-memory or fixture-managed database",
        ),
        HintRule::new(
            ["logging.", "logger.", "log."],
            "Assert on log output with the caplog fixture",
        ),
        HintRule::new(["input("], "Feed stdin with monkeypatch on builtins.input"),
        HintRule::new(["print("], "Capture stdout with the capsys fixture"),
    ]
}

/// Matches hint rules against source text.
///
/// A pattern starting with an identifier character only matches at the start
/// of a word, so `open(` does not fire inside `urlopen(` and `log.` does not
/// fire inside `catalog.`.
#[derive(Debug, Clone)]
pub struct HintDetector {
    automaton: Option<AhoCorasick>,
    /// Rule index of each automaton pattern
    pattern_rules: Vec<usize>,
    /// Whether each automaton pattern must start a word
    word_start: Vec<bool>,
    hints: Vec<String>,
}

impl HintDetector {
    /// Build a detector over the given rules. Empty patterns are ignored.
    pub fn new(rules: &[HintRule]) -> Result<Self> {
        let mut patterns = Vec::new();
        let mut pattern_rules = Vec::new();
        let mut word_start = Vec::new();
        for (rule_idx, rule) in rules.iter().enumerate() {
            for pattern in rule.patterns.iter().filter(|p| !p.is_empty()) {
                patterns.push(pattern.as_str());
                pattern_rules.push(rule_idx);
                word_start.push(pattern.bytes().next().is_some_and(is_word_byte));
            }
        }

        let automaton = if patterns.is_empty() {
            None
        } else {
            let automaton = AhoCorasick::builder()
                .match_kind(MatchKind::Standard)
                .build(&patterns)
                .map_err(|e| {
                    CoveredError::config_field(
                        format!("failed to build hint matcher: {e}"),
                        "hints.extra_rules",
                    )
                })?;
            Some(automaton)
        };

        Ok(Self {
            automaton,
            pattern_rules,
            word_start,
            hints: rules.iter().map(|rule| rule.hint.clone()).collect(),
        })
    }

    /// Built-in rules followed by the configured extras. A disabled
    /// configuration yields a detector that never matches.
    pub fn from_config(config: &HintConfig) -> Result<Self> {
        if !config.enabled {
            return Self::new(&[]);
        }
        let mut rules = builtin_rules();
        rules.extend(config.extra_rules.iter().cloned());
        Self::new(&rules)
    }

    /// Hints whose patterns occur in `text`, by first occurrence.
    pub fn detect(&self, text: &str) -> Vec<String> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };

        let mut first_seen: Vec<Option<usize>> = vec![None; self.hints.len()];
        let bytes = text.as_bytes();
        for found in automaton.find_overlapping_iter(text) {
            let pattern = found.pattern().as_usize();
            let inside_word = found.start() > 0 && is_word_byte(bytes[found.start() - 1]);
            if self.word_start[pattern] && inside_word {
                continue;
            }
            let rule = self.pattern_rules[pattern];
            let slot = &mut first_seen[rule];
            if slot.map_or(true, |start| found.start() < start) {
                *slot = Some(found.start());
            }
        }

        let mut hits: Vec<(usize, usize)> = first_seen
            .iter()
            .enumerate()
            .filter_map(|(rule, start)| start.map(|start| (start, rule)))
            .collect();
        hits.sort_unstable();

        let ordered: IndexSet<&str> = hits
            .into_iter()
            .map(|(_, rule)| self.hints[rule].as_str())
            .collect();
        ordered.into_iter().map(str::to_string).collect()
    }
}

/// ASCII identifier characters and any byte of a multi-byte character.
fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || !byte.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> HintDetector {
        HintDetector::new(&builtin_rules()).unwrap()
    }

    #[test]
    fn orders_by_first_occurrence() {
        let text = "def f():\n    seed = random.random()\n    return requests.get(url)\n";
        let hints = builtin().detect(text);
        assert_eq!(hints.len(), 2);
        assert!(hints[0].contains("random"));
        assert!(hints[1].contains("network"));
    }

    #[test]
    fn repeated_matches_emit_one_hint() {
        let text = "requests.get(a)\nrequests.post(b)\nhttpx.get(c)\n";
        let hints = builtin().detect(text);
        assert_eq!(hints.len(), 1);
    }

    #[test]
    fn shared_hint_text_is_deduplicated() {
        let rules = vec![
            HintRule::new(["alpha"], "same"),
            HintRule::new(["beta"], "same"),
            HintRule::new(["gamma"], "other"),
        ];
        let detector = HintDetector::new(&rules).unwrap();
        assert_eq!(detector.detect("beta gamma alpha"), vec!["same", "other"]);
    }

    #[test]
    fn overlapping_patterns_all_count() {
        let rules = vec![
            HintRule::new(["os.environ"], "env"),
            HintRule::new(["environ"], "bare"),
        ];
        let detector = HintDetector::new(&rules).unwrap();
        assert_eq!(detector.detect("x = os.environ['A']"), vec!["env", "bare"]);
    }

    #[test]
    fn patterns_do_not_fire_inside_longer_names() {
        let text = "page = urllib.request.urlopen(url)\nitems = catalog.items()\n";
        let hints = builtin().detect(text);
        assert_eq!(hints.len(), 1);
        assert!(hints[0].contains("network"));

        let hints = builtin().detect("data = open(path).read()\nself.log.info(data)\n");
        assert_eq!(hints.len(), 2);
        assert!(hints[0].contains("tmp_path"));
        assert!(hints[1].contains("caplog"));
    }

    #[test]
    fn nothing_matches_in_plain_code() {
        assert!(builtin().detect("def add(a, b):\n    return a + b\n").is_empty());
    }

    #[test]
    fn disabled_config_never_matches() {
        let config = HintConfig {
            enabled: false,
            ..HintConfig::default()
        };
        let detector = HintDetector::from_config(&config).unwrap();
        assert!(detector.detect("requests.get(url)").is_empty());
    }

    #[test]
    fn extra_rules_follow_builtins() {
        let config = HintConfig {
            extra_rules: vec![HintRule::new(["boto3."], "Stub AWS clients with moto")],
            ..HintConfig::default()
        };
        let detector = HintDetector::from_config(&config).unwrap();
        let hints = detector.detect("client = boto3.client('s3')\nprint(client)");
        assert_eq!(hints[0], "Stub AWS clients with moto");
        assert!(hints[1].contains("capsys"));
    }
}
