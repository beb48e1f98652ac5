//! `fukurow-cli` entry point.

use anyhow::Result;
use clap::Parser;
use fukurow_cli::commands::{self, Cli};
use fukurow_cli::interactive;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    if std::env::args().len() == 1 {
        interactive::run()?;
        return Ok(());
    }

    let cli = Cli::parse();
    let outcome = commands::execute(cli.command)?;
    std::process::exit(if outcome.success { 0 } else { 1 });
}
