//! fewshot-config
//!
//! Resolves the effective configuration of a few-shot run and prints it.

use anyhow::{Context, Result};
use clap::Parser;
use fewshot_config::cli::Cli;
use fewshot_config::config::Resolver;
use std::io::Write;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let options = cli.resolver_options();
    let resolver = Resolver::resolve(&options, cli.resolve_request())
        .context("Failed to resolve configuration")?;

    let rendered = cli.format.render(resolver.config())?;
    std::io::stdout().lock().write_all(rendered.as_bytes())?;
    Ok(())
}
