//! Configuration types and management for code-covered.
//!
//! Every field carries a serde default, so a partial YAML file (or an empty one)
//! deserializes into a usable configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CoveredError, Result};
use crate::detectors::coverage::config::{HintConfig, TemplateConfig};

/// Main configuration for the gap analysis engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoveredConfig {
    /// Engine scheduling settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Setup-hint heuristics
    #[serde(default)]
    pub hints: HintConfig,

    /// Test template rendering
    #[serde(default)]
    pub templates: TemplateConfig,
}

impl CoveredConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            CoveredError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(Into::into)
    }

    /// Serialize configuration as YAML
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = self.to_yaml_string()?;
        std::fs::write(&path, content).map_err(|e| {
            CoveredError::io(format!("Failed to write config file: {}", path.display()), e)
        })
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        self.hints.validate()?;
        self.templates.validate()?;
        Ok(())
    }
}

/// Scheduling configuration for the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Analyze files on the rayon thread pool
    #[serde(default = "AnalysisConfig::default_parallel")]
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parallel: Self::default_parallel(),
        }
    }
}

impl AnalysisConfig {
    const fn default_parallel() -> bool {
        true
    }
}

/// Validate that a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(CoveredError::config_field(
            format!("{} must be greater than 0", field),
            field,
        ));
    }
    Ok(())
}

/// Validate that a string value is not blank.
pub fn validate_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoveredError::config_field(
            format!("{} must not be empty", field),
            field,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::coverage::hints::HintRule;

    #[test]
    fn default_config_is_valid() {
        let config = CoveredConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.analysis.parallel);
        assert!(config.hints.enabled);
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = CoveredConfig::from_yaml_str("   \n").unwrap();
        assert!(config.analysis.parallel);
        assert_eq!(config.templates.placeholder, "...");
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = r#"
analysis:
  parallel: false
hints:
  extra_rules:
    - patterns: ["boto3."]
      hint: "Stub AWS clients with moto"
"#;
        let config = CoveredConfig::from_yaml_str(yaml).unwrap();
        assert!(!config.analysis.parallel);
        assert!(config.hints.enabled);
        assert_eq!(
            config.hints.extra_rules,
            vec![HintRule::new(["boto3."], "Stub AWS clients with moto")]
        );
        assert_eq!(config.templates.condition_fragment_max_len, 40);
    }

    #[test]
    fn zero_fragment_length_is_rejected() {
        let mut config = CoveredConfig::default();
        config.templates.condition_fragment_max_len = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoveredError::Config { .. }));
    }

    #[test]
    fn yaml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code-covered.yml");

        let mut config = CoveredConfig::default();
        config.templates.include_hints = false;
        config.to_yaml_file(&path).unwrap();

        let loaded = CoveredConfig::from_yaml_file(&path).unwrap();
        assert!(!loaded.templates.include_hints);
        assert_eq!(loaded.hints, config.hints);
    }

    #[test]
    fn from_yaml_file_reports_missing_path() {
        let err = CoveredConfig::from_yaml_file("/definitely/not/here.yml").unwrap_err();
        assert!(matches!(err, CoveredError::Io { .. }));
    }
}
