//! CLI argument structures.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use code_covered::io::reports::ReportFormat;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Turn coverage gaps into pytest test suggestions
#[derive(Parser, Debug)]
#[command(name = "code-covered")]
#[command(version = VERSION)]
#[command(about = "Find uncovered code and suggest the tests that would cover it")]
#[command(long_about = "
Reads a coverage.py JSON report (coverage json -o coverage.json), attributes each
run of missed lines to the construct it belongs to, and prints one prioritized
test suggestion per gap.

Common Usage:

  # Summary of gaps, sources resolved against the current directory
  code-covered coverage.json

  # Sources live elsewhere
  code-covered coverage.json --source-root ./project

  # Emit a pytest module to start from
  code-covered coverage.json --format pytest > tests/test_gaps.py
")]
pub struct Cli {
    /// Coverage report in coverage.py JSON format
    #[arg(required_unless_present = "print_default_config")]
    pub report: Option<PathBuf>,

    /// Directory report paths are resolved against
    #[arg(long, short = 's', default_value = ".", env = "CODE_COVERED_SOURCE_ROOT")]
    pub source_root: PathBuf,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// YAML configuration file
    #[arg(long, short = 'c', env = "CODE_COVERED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Analyze files one at a time instead of in parallel
    #[arg(long)]
    pub sequential: bool,

    /// Print the default configuration as YAML and exit
    #[arg(long)]
    pub print_default_config: bool,

    /// Enable verbose logging for debugging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Machine-readable analysis
    Json,
    /// pytest module with one test per gap
    Pytest,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Pytest => ReportFormat::Pytest,
        }
    }
}
