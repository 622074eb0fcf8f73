//! Config file loading with include resolution.
//!
//! A config file may list secondary files under the reserved `includes` key.
//! Each include is loaded from the includes directory and merged beneath the
//! file, in order, so later includes override earlier ones. The file's own
//! top-level keys are applied last: includes only fill keys the file leaves
//! unset.

use super::decode::{decode_str, describe};
use super::merge::flat_merge;
use super::types::{
    ConfigMapping, ConfigValue, DefaultsSource, EMBEDDED_DEFAULTS, INCLUDES_KEY,
};
use crate::error::{ConfigError, Result};
use std::path::Path;
use tracing::debug;

/// Load a config file and its includes.
///
/// Returns an empty mapping when `path` is `None`. Include names are joined to
/// `includes_dir`. Includes are not followed recursively.
pub fn load_config_file(path: Option<&Path>, includes_dir: &Path) -> Result<ConfigMapping> {
    let Some(path) = path else {
        return Ok(ConfigMapping::new());
    };

    let origin = path.display().to_string();
    let own = read_mapping(path)?;
    debug!(path = %origin, keys = own.len(), "Loaded config file");
    apply_includes(own, includes_dir, &origin)
}

/// Load the default tier from its configured source.
pub fn load_defaults(source: &DefaultsSource, includes_dir: &Path) -> Result<ConfigMapping> {
    match source {
        DefaultsSource::Embedded => {
            let own = decode_str(EMBEDDED_DEFAULTS, "embedded defaults")?;
            apply_includes(own, includes_dir, "embedded defaults")
        }
        DefaultsSource::File(path) => load_config_file(Some(path.as_path()), includes_dir),
        DefaultsSource::Empty => Ok(ConfigMapping::new()),
    }
}

/// Merge the includes named by `own` beneath it.
fn apply_includes(
    mut own: ConfigMapping,
    includes_dir: &Path,
    origin: &str,
) -> Result<ConfigMapping> {
    let includes = include_names(&own, origin)?;
    if includes.is_empty() {
        own.remove(INCLUDES_KEY);
        return Ok(own);
    }

    let mut working = own.clone();
    for name in &includes {
        let include_path = includes_dir.join(name);
        let included = read_mapping(&include_path)?;
        debug!(
            parent = %origin,
            include = %include_path.display(),
            keys = included.len(),
            "Merged include"
        );
        working = flat_merge(working, included);
    }

    working.remove(INCLUDES_KEY);
    own.remove(INCLUDES_KEY);
    Ok(flat_merge(working, own))
}

/// Read the `includes` list. Absent or null means no includes.
fn include_names(mapping: &ConfigMapping, origin: &str) -> Result<Vec<String>> {
    match mapping.get(INCLUDES_KEY) {
        None | Some(ConfigValue::Null) => Ok(Vec::new()),
        Some(ConfigValue::Sequence(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    let found = describe(item);
                    ConfigError::malformed(
                        origin,
                        format!("'{INCLUDES_KEY}' entries must be file names, found {found}"),
                    )
                })
            })
            .collect(),
        Some(other) => Err(ConfigError::malformed(
            origin,
            format!("'{INCLUDES_KEY}' must be a sequence, found {}", describe(other)),
        )),
    }
}

fn read_mapping(path: &Path) -> Result<ConfigMapping> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    decode_str(&content, &path.display().to_string())
}
