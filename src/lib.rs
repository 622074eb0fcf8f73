//! Layered configuration resolver for few-shot learning runs.
//!
//! Combines built-in defaults, a YAML file with includes, a programmatic
//! mapping and command-line overrides into one effective configuration, then
//! derives the fields every run needs (test episode shape, a free port, resume
//! location, scale ratio).

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
