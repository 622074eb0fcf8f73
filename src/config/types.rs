//! Configuration types shared by the loader, the merge helpers and the resolver.

use std::path::PathBuf;

/// A single configuration value: scalar, string, sequence or nested mapping.
pub type ConfigValue = serde_yaml::Value;

/// An insertion-ordered mapping from string keys to configuration values.
pub type ConfigMapping = serde_yaml::Mapping;

/// Reserved key listing secondary files merged beneath a config file.
pub const INCLUDES_KEY: &str = "includes";

/// Derived keys and the keys they fall back to when unset.
pub const TEST_FALLBACKS: [(&str, &str); 3] = [
    ("test_way", "way_num"),
    ("test_shot", "shot_num"),
    ("test_query", "query_num"),
];

pub const PORT_KEY: &str = "port";
pub const RESUME_KEY: &str = "resume";
pub const RESUME_PATH_KEY: &str = "resume_path";
pub const TB_SCALE_KEY: &str = "tb_scale";
pub const TRAIN_EPISODE_KEY: &str = "train_episode";
pub const TEST_EPISODE_KEY: &str = "test_episode";

/// Per-run config file name stripped from the file path when resuming.
pub const RUN_CONFIG_SUFFIX: &str = "/config.yaml";

/// Directory that include file names are resolved against.
pub const DEFAULT_INCLUDES_DIR: &str = "./config/";

/// Built-in defaults, embedded at build time.
pub const EMBEDDED_DEFAULTS: &str = include_str!("../defaults/default.yaml");

/// Configuration source, in priority order (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    /// Built-in defaults (lowest priority)
    Default = 0,
    /// User config file, with its includes
    File = 1,
    /// Mapping supplied by the embedding program
    Variable = 2,
    /// Command-line flags (highest priority)
    Console = 3,
}

impl Source {
    /// All sources, lowest priority first.
    pub const ALL: [Source; 4] = [
        Source::Default,
        Source::File,
        Source::Variable,
        Source::Console,
    ];
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Default => write!(f, "default"),
            Source::File => write!(f, "file"),
            Source::Variable => write!(f, "variable"),
            Source::Console => write!(f, "console"),
        }
    }
}

/// How the four sources are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Top-level keys of a higher source replace whole values (default).
    #[default]
    Flat,
    /// Nested mappings are combined key by key.
    Recursive,
}

/// Where the lowest-priority source comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefaultsSource {
    /// The defaults compiled into the crate
    #[default]
    Embedded,
    /// A YAML file on disk, loaded with include support
    File(PathBuf),
    /// No defaults at all
    Empty,
}

/// Options controlling a resolver run.
///
/// Replaces process-wide lookups: everything the resolver reads from outside
/// its arguments is named here.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Source of the default tier
    pub defaults: DefaultsSource,
    /// Directory include file names are joined to
    pub includes_dir: PathBuf,
    /// Cross-source merge semantics
    pub merge_strategy: MergeStrategy,
    /// Host probed when allocating a port
    pub port_host: std::net::IpAddr,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            defaults: DefaultsSource::default(),
            includes_dir: PathBuf::from(DEFAULT_INCLUDES_DIR),
            merge_strategy: MergeStrategy::default(),
            port_host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
        }
    }
}

impl ResolverOptions {
    pub fn with_defaults(mut self, defaults: DefaultsSource) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_includes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.includes_dir = dir.into();
        self
    }

    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }
}

/// Look up a key, treating an explicit null the same as absence.
pub fn get_set<'a>(mapping: &'a ConfigMapping, key: &str) -> Option<&'a ConfigValue> {
    mapping.get(key).filter(|v| !v.is_null())
}
