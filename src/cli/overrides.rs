//! Command-line configuration overrides.
//!
//! Each flag maps onto the configuration key of the same name. Flags that are
//! not given are left out of the console mapping entirely, so they never mask a
//! value from a lower-priority source.

use crate::config::{ConfigMapping, ConfigValue};
use clap::builder::BoolishValueParser;
use clap::{Args, ValueEnum};

/// Log level recorded in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }
}

/// Flags overriding individual configuration keys.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConsoleOverrides {
    /// Classes per episode
    #[arg(short = 'w', long = "way_num", value_name = "N")]
    pub way_num: Option<i64>,

    /// Support samples per class
    #[arg(short = 's', long = "shot_num", value_name = "N")]
    pub shot_num: Option<i64>,

    /// Query samples per class
    #[arg(short = 'q', long = "query_num", value_name = "N")]
    pub query_num: Option<i64>,

    /// Batch size
    #[arg(long = "batch_size", visible_alias = "bs", value_name = "N")]
    pub batch_size: Option<i64>,

    /// Episodes per batch
    #[arg(long = "episode_size", visible_alias = "es", value_name = "N")]
    pub episode_size: Option<i64>,

    /// Dataset path
    #[arg(long = "data_root", visible_alias = "data", value_name = "PATH")]
    pub data_root: Option<String>,

    /// Log directory name, if a specific one is needed
    #[arg(long = "log_name", value_name = "NAME")]
    pub log_name: Option<String>,

    /// Image size
    #[arg(long = "image_size", value_name = "N")]
    pub image_size: Option<i64>,

    /// Use augmentation or not
    #[arg(
        long = "augment",
        visible_alias = "aug",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub augment: Option<bool>,

    /// Augment times for support samples
    #[arg(long = "augment_times", visible_alias = "aug_times", value_name = "N")]
    pub augment_times: Option<i64>,

    /// Augment times for query samples
    #[arg(long = "augment_times_query", visible_alias = "aug_times_query", value_name = "N")]
    pub augment_times_query: Option<i64>,

    /// Training episodes per epoch
    #[arg(long = "train_episode", value_name = "N")]
    pub train_episode: Option<i64>,

    /// Test episodes per epoch
    #[arg(long = "test_episode", value_name = "N")]
    pub test_episode: Option<i64>,

    /// Number of epochs
    #[arg(long = "epoch", visible_alias = "epochs", value_name = "N")]
    pub epoch: Option<i64>,

    /// Result path
    #[arg(long = "result_root", visible_alias = "result", value_name = "PATH")]
    pub result_root: Option<String>,

    /// Checkpoint save interval
    #[arg(long = "save_interval", value_name = "N")]
    pub save_interval: Option<i64>,

    /// Log level
    #[arg(long = "log_level", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log interval
    #[arg(long = "log_interval", value_name = "N")]
    pub log_interval: Option<i64>,

    /// Device ids, e.g. "0,1"
    #[arg(long = "device_ids", visible_alias = "gpus", value_name = "IDS")]
    pub device_ids: Option<String>,

    /// Number of GPUs
    #[arg(long = "n_gpu", value_name = "N")]
    pub n_gpu: Option<i64>,

    /// Random seed
    #[arg(long = "seed", value_name = "N")]
    pub seed: Option<i64>,

    /// Deterministic or not
    #[arg(long = "deterministic", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub deterministic: Option<bool>,

    /// Experiment tag
    #[arg(long = "tag", value_name = "TAG")]
    pub tag: Option<String>,
}

impl ConsoleOverrides {
    /// Build the console-source mapping from the flags that were given.
    pub fn to_mapping(&self) -> ConfigMapping {
        let mut mapping = ConfigMapping::new();
        let mut set = |key: &str, value: Option<ConfigValue>| {
            if let Some(value) = value {
                mapping.insert(key.into(), value);
            }
        };

        set("way_num", self.way_num.map(Into::into));
        set("shot_num", self.shot_num.map(Into::into));
        set("query_num", self.query_num.map(Into::into));
        set("batch_size", self.batch_size.map(Into::into));
        set("episode_size", self.episode_size.map(Into::into));
        set("data_root", self.data_root.clone().map(Into::into));
        set("log_name", self.log_name.clone().map(Into::into));
        set("image_size", self.image_size.map(Into::into));
        set("augment", self.augment.map(Into::into));
        set("augment_times", self.augment_times.map(Into::into));
        set("augment_times_query", self.augment_times_query.map(Into::into));
        set("train_episode", self.train_episode.map(Into::into));
        set("test_episode", self.test_episode.map(Into::into));
        set("epoch", self.epoch.map(Into::into));
        set("result_root", self.result_root.clone().map(Into::into));
        set("save_interval", self.save_interval.map(Into::into));
        set("log_level", self.log_level.map(|l| l.as_str().into()));
        set("log_interval", self.log_interval.map(Into::into));
        set("device_ids", self.device_ids.clone().map(Into::into));
        set("n_gpu", self.n_gpu.map(Into::into));
        set("seed", self.seed.map(Into::into));
        set("deterministic", self.deterministic.map(Into::into));
        set("tag", self.tag.clone().map(Into::into));

        mapping
    }
}
