//! Resolution of the effective configuration.
//!
//! Sources are merged lowest to highest priority (default, file, variable,
//! console), then a derivation pass fills computed keys:
//!
//! 1. `test_way` / `test_shot` / `test_query` fall back to `way_num` /
//!    `shot_num` / `query_num` when unset
//! 2. `port` is allocated when unset
//! 3. `resume` records whether this run resumes
//! 4. `resume_path` is the run directory of the resumed config file
//! 5. `tb_scale` is `train_episode / test_episode`
//!
//! The result is computed once, in [`Resolver::resolve`], and is read-only
//! afterwards.

use super::decode::describe;
use super::loader::{load_config_file, load_defaults};
use super::merge::merge;
use super::port::{PortAllocation, PortAllocator, PortProbe, TcpProbe};
use super::types::{
    ConfigMapping, ConfigValue, PORT_KEY, RESUME_KEY, RESUME_PATH_KEY, RUN_CONFIG_SUFFIX,
    ResolverOptions, Source, TB_SCALE_KEY, TEST_EPISODE_KEY, TEST_FALLBACKS, TRAIN_EPISODE_KEY,
    get_set,
};
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inputs of one resolution, other than the resolver options.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// User config file, loaded with its includes
    pub file_path: Option<PathBuf>,
    /// Mapping supplied by the embedding program
    pub variables: Option<ConfigMapping>,
    /// Flags given on the command line, unset flags omitted
    pub console: ConfigMapping,
    /// Whether this run resumes a previous one
    pub is_resuming: bool,
}

impl ResolveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_variables(mut self, variables: ConfigMapping) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_console(mut self, console: ConfigMapping) -> Self {
        self.console = console;
        self
    }

    pub fn resuming(mut self, is_resuming: bool) -> Self {
        self.is_resuming = is_resuming;
        self
    }
}

/// The four source mappings and the effective configuration derived from them.
#[derive(Debug, Clone)]
pub struct Resolver {
    default: ConfigMapping,
    file: ConfigMapping,
    variable: ConfigMapping,
    console: ConfigMapping,
    config: ConfigMapping,
    port_allocation: Option<PortAllocation>,
    is_resuming: bool,
}

impl Resolver {
    /// Resolve with a TCP probe against `options.port_host`.
    pub fn resolve(options: &ResolverOptions, request: ResolveRequest) -> Result<Self> {
        let probe = TcpProbe::new(options.port_host);
        Self::resolve_with_probe(options, request, probe)
    }

    /// Resolve with a caller-supplied port probe.
    pub fn resolve_with_probe<P: PortProbe>(
        options: &ResolverOptions,
        request: ResolveRequest,
        probe: P,
    ) -> Result<Self> {
        Self::resolve_with_allocator(options, request, &PortAllocator::new(probe))
    }

    pub(crate) fn resolve_with_allocator<P: PortProbe>(
        options: &ResolverOptions,
        request: ResolveRequest,
        allocator: &PortAllocator<P>,
    ) -> Result<Self> {
        let ResolveRequest {
            file_path,
            variables,
            console,
            is_resuming,
        } = request;

        let default = load_defaults(&options.defaults, &options.includes_dir)?;
        let file = load_config_file(file_path.as_deref(), &options.includes_dir)?;
        let variable = variables.unwrap_or_default();

        let mut config = ConfigMapping::new();
        for (source, mapping) in [
            (Source::Default, &default),
            (Source::File, &file),
            (Source::Variable, &variable),
            (Source::Console, &console),
        ] {
            debug!(source = %source, keys = mapping.len(), "Merging configuration source");
            config = merge(options.merge_strategy, config, mapping.clone());
        }

        apply_test_fallbacks(&mut config);

        let port_allocation = if get_set(&config, PORT_KEY).is_none() {
            let allocation = allocator.allocate()?;
            info!(
                port = allocation.port,
                collisions = allocation.collisions,
                "Allocated port"
            );
            config.insert(PORT_KEY.into(), allocation.port.into());
            Some(allocation)
        } else {
            None
        };

        config.insert(RESUME_KEY.into(), is_resuming.into());
        if is_resuming {
            let path = file_path.as_deref().ok_or(ConfigError::ResumeWithoutFile)?;
            let run_dir = run_dir_of(path);
            config.insert(
                RESUME_PATH_KEY.into(),
                run_dir.to_string_lossy().into_owned().into(),
            );
        }

        let tb_scale = episode_ratio(&config)?;
        config.insert(TB_SCALE_KEY.into(), tb_scale.into());

        info!(keys = config.len(), resume = is_resuming, "Resolved configuration");

        Ok(Self {
            default,
            file,
            variable,
            console,
            config,
            port_allocation,
            is_resuming,
        })
    }

    /// The effective configuration.
    pub fn config(&self) -> &ConfigMapping {
        &self.config
    }

    /// Consume the resolver and return the effective configuration.
    pub fn into_config(self) -> ConfigMapping {
        self.config
    }

    /// Look up one key of the effective configuration.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.config.get(key)
    }

    /// The mapping one source contributed, before merging.
    pub fn source(&self, source: Source) -> &ConfigMapping {
        match source {
            Source::Default => &self.default,
            Source::File => &self.file,
            Source::Variable => &self.variable,
            Source::Console => &self.console,
        }
    }

    /// The port allocation, if `port` was not set by any source.
    pub fn port_allocation(&self) -> Option<&PortAllocation> {
        self.port_allocation.as_ref()
    }

    pub fn is_resuming(&self) -> bool {
        self.is_resuming
    }
}

/// Copy `way_num` etc. into `test_way` etc. where the latter are unset.
fn apply_test_fallbacks(config: &mut ConfigMapping) {
    for (target, fallback) in TEST_FALLBACKS {
        if get_set(config, target).is_some() {
            continue;
        }
        if let Some(value) = config.get(fallback).cloned() {
            config.insert(target.into(), value);
        }
    }
}

/// Strip the per-run config file name from a resumed config path.
///
/// Paths not ending in `/config.yaml` resolve to their parent directory.
pub fn run_dir_of(config_path: &Path) -> PathBuf {
    let text = config_path.to_string_lossy();
    match text.strip_suffix(RUN_CONFIG_SUFFIX) {
        Some(dir) => PathBuf::from(dir),
        None => config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    }
}

/// `train_episode / test_episode` as a float.
fn episode_ratio(config: &ConfigMapping) -> Result<f64> {
    let train = numeric(config, TRAIN_EPISODE_KEY)?;
    let test = numeric(config, TEST_EPISODE_KEY)?;
    if test == 0.0 {
        return Err(ConfigError::DivisionByZero {
            target: TB_SCALE_KEY,
            denominator: TEST_EPISODE_KEY,
        });
    }
    Ok(train / test)
}

/// Numbers, or strings that parse as numbers (`"1000"`).
fn numeric(config: &ConfigMapping, key: &str) -> Result<f64> {
    let value = get_set(config, key).ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
    let number = match value {
        ConfigValue::String(text) => text.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    number.ok_or_else(|| ConfigError::NotNumeric {
        key: key.to_string(),
        found: describe(value).to_string(),
    })
}
