//! Output formatting for the effective configuration.

use crate::config::ConfigMapping;
use anyhow::Result;
use clap::ValueEnum;

/// Output format for the resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Render a mapping, always ending with a newline.
    ///
    /// JSON has no infinities or NaN; those floats render as `null`.
    pub fn render(&self, mapping: &ConfigMapping) -> Result<String> {
        let mut out = match self {
            OutputFormat::Yaml => serde_yaml::to_string(mapping)?,
            OutputFormat::Json => serde_json::to_string_pretty(mapping)?,
        };
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}
