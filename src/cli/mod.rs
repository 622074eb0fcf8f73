//! CLI definitions for fewshot-config.
//!
//! The `Cli` struct carries the tool's own options plus the flattened
//! configuration overrides, which become the console source.

pub mod overrides;

use crate::config::{DefaultsSource, MergeStrategy, ResolveRequest, ResolverOptions};
use crate::format::OutputFormat;
use clap::Parser;
use overrides::ConsoleOverrides;
use std::path::PathBuf;

pub use overrides::LogLevel;

/// Resolve and print the effective configuration of a few-shot run
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the run configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Resume the run whose saved config is given with --config
    #[arg(long)]
    pub resume: bool,

    /// Defaults file (default: built-in defaults)
    #[arg(long, value_name = "FILE")]
    pub defaults: Option<PathBuf>,

    /// Directory that include file names are resolved against
    #[arg(long, value_name = "DIR", default_value = crate::config::DEFAULT_INCLUDES_DIR)]
    pub includes_dir: PathBuf,

    /// Combine nested mappings key by key instead of replacing them
    #[arg(long)]
    pub recursive_merge: bool,

    /// Output format for the effective configuration
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: ConsoleOverrides,
}

impl Cli {
    /// Resolver options selected by the tool flags.
    pub fn resolver_options(&self) -> ResolverOptions {
        let defaults = match &self.defaults {
            Some(path) => DefaultsSource::File(path.clone()),
            None => DefaultsSource::Embedded,
        };
        let strategy = if self.recursive_merge {
            MergeStrategy::Recursive
        } else {
            MergeStrategy::Flat
        };
        ResolverOptions::default()
            .with_defaults(defaults)
            .with_includes_dir(self.includes_dir.clone())
            .with_merge_strategy(strategy)
    }

    /// The request for this invocation. There is no variable source on the
    /// command line.
    pub fn resolve_request(&self) -> ResolveRequest {
        let mut request = ResolveRequest::new()
            .with_console(self.overrides.to_mapping())
            .resuming(self.resume);
        if let Some(ref path) = self.config {
            request = request.with_file(path.clone());
        }
        request
    }
}
