//! Command execution.

use anyhow::Context;
use tracing::info;

use code_covered::io::reports::render;
use code_covered::{CoverageReport, CoveredConfig, GapEngine, RootResolver};

use super::args::Cli;

/// Load configuration: the given file, or defaults, with CLI overrides applied.
pub fn load_configuration(cli: &Cli) -> anyhow::Result<CoveredConfig> {
    let mut config = match &cli.config {
        Some(path) => CoveredConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => CoveredConfig::default(),
    };
    if cli.sequential {
        config.analysis.parallel = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Print the default configuration as YAML.
pub fn print_default_config() -> anyhow::Result<()> {
    let yaml = CoveredConfig::default().to_yaml_string()?;
    print!("{yaml}");
    Ok(())
}

/// Analyze the report named on the command line and print the result.
pub fn analyze_command(cli: &Cli) -> anyhow::Result<()> {
    let report_path = cli
        .report
        .as_ref()
        .context("a coverage report path is required")?;
    let config = load_configuration(cli)?;

    let content = std::fs::read_to_string(report_path)
        .with_context(|| format!("Failed to read coverage report {}", report_path.display()))?;
    let report = CoverageReport::from_json_str(&content)
        .with_context(|| format!("Invalid coverage report {}", report_path.display()))?;

    info!(
        report = %report_path.display(),
        files = report.len(),
        "loaded coverage report"
    );

    let engine = GapEngine::new(config)?;
    let analysis = engine.find_gaps(&report, &RootResolver::new(&cli.source_root));

    let output = render(&analysis, cli.format.into())?;
    print!("{output}");
    Ok(())
}
