//! code-covered CLI: coverage gaps to prioritized pytest suggestions.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.print_default_config {
        return cli::print_default_config();
    }
    cli::analyze_command(&cli)
}
