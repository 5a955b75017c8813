use serde::{Deserialize, Serialize};

use crate::core::config::{validate_non_empty, validate_positive_usize};
use crate::core::errors::{CoveredError, Result};
use crate::detectors::coverage::hints::HintRule;

/// Configuration for setup-hint detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintConfig {
    /// Whether hints are detected at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Rules appended after the built-in rule set
    #[serde(default)]
    pub extra_rules: Vec<HintRule>,

    /// Add hints from structural risk checks (silent handlers, mutable
    /// defaults, unclosed files, unreachable code, complex functions)
    #[serde(default = "default_true")]
    pub structural: bool,

    /// Decision count above which a function is flagged as complex
    #[serde(default = "default_complexity_threshold")]
    pub complexity_threshold: usize,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_rules: Vec::new(),
            structural: true,
            complexity_threshold: default_complexity_threshold(),
        }
    }
}

impl HintConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.complexity_threshold, "hints.complexity_threshold")?;
        for (idx, rule) in self.extra_rules.iter().enumerate() {
            let field = format!("hints.extra_rules[{idx}]");
            if rule.patterns.iter().all(|p| p.trim().is_empty()) {
                return Err(CoveredError::config_field(
                    "hint rule needs at least one non-empty pattern",
                    format!("{field}.patterns"),
                ));
            }
            validate_non_empty(&rule.hint, &format!("{field}.hint"))?;
        }
        Ok(())
    }
}

/// Configuration for test template rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Maximum length of the condition fragment in branch test names
    #[serde(default = "default_condition_fragment_max_len")]
    pub condition_fragment_max_len: usize,

    /// Append detected hints as `# Hint:` comments
    #[serde(default = "default_true")]
    pub include_hints: bool,

    /// Placeholder written where call arguments go
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// List `None`, `[]` and `''` edge cases per parameter in the Arrange
    /// section of branch and function-body templates
    #[serde(default = "default_true")]
    pub edge_case_comments: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            condition_fragment_max_len: default_condition_fragment_max_len(),
            include_hints: true,
            placeholder: default_placeholder(),
            edge_case_comments: true,
        }
    }
}

impl TemplateConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(
            self.condition_fragment_max_len,
            "templates.condition_fragment_max_len",
        )?;
        validate_non_empty(&self.placeholder, "templates.placeholder")?;
        Ok(())
    }
}

const fn default_true() -> bool {
    true
}

const fn default_complexity_threshold() -> usize {
    10
}

const fn default_condition_fragment_max_len() -> usize {
    40
}

fn default_placeholder() -> String {
    "...".to_string()
}
