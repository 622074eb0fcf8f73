//! Flat and recursive merging of configuration mappings.
//!
//! Both merges let `overlay` win on every key it names. They differ only when
//! both sides hold a nested mapping under the same key: the flat merge replaces
//! the whole subtree, the recursive merge combines the two key by key.
//!
//! Sequences are replaced entirely, never concatenated. An explicit null in the
//! overlay is a value like any other and overwrites the base.

use super::types::{ConfigMapping, ConfigValue, MergeStrategy};

/// Set every key of `overlay` into `base`, replacing whole values.
///
/// # Example
/// ```
/// use fewshot_config::config::{ConfigMapping, flat_merge};
///
/// let base: ConfigMapping = serde_yaml::from_str("m: {x: 1, y: 2}").unwrap();
/// let overlay: ConfigMapping = serde_yaml::from_str("m: {y: 3}").unwrap();
/// let merged = flat_merge(base, overlay);
/// assert_eq!(merged, serde_yaml::from_str::<ConfigMapping>("m: {y: 3}").unwrap());
/// ```
pub fn flat_merge(mut base: ConfigMapping, overlay: ConfigMapping) -> ConfigMapping {
    for (key, value) in overlay {
        base.insert(key, value);
    }
    base
}

/// Merge `overlay` into `base`, descending into nested mappings.
///
/// Where the overlay holds a mapping, it is merged against the base's mapping
/// at that key, or against an empty mapping when the base has none there.
/// Every other overlay value replaces the base value directly.
///
/// # Example
/// ```
/// use fewshot_config::config::{ConfigMapping, recursive_merge};
///
/// let base: ConfigMapping = serde_yaml::from_str("m: {x: 1, y: 2}").unwrap();
/// let overlay: ConfigMapping = serde_yaml::from_str("m: {y: 3}").unwrap();
/// let merged = recursive_merge(base, overlay);
/// assert_eq!(merged, serde_yaml::from_str::<ConfigMapping>("m: {x: 1, y: 3}").unwrap());
/// ```
pub fn recursive_merge(mut base: ConfigMapping, overlay: ConfigMapping) -> ConfigMapping {
    for (key, overlay_value) in overlay {
        let merged_value = match overlay_value {
            ConfigValue::Mapping(overlay_map) => {
                let base_map = match base.get_mut(&key) {
                    Some(ConfigValue::Mapping(base_map)) => std::mem::take(base_map),
                    _ => ConfigMapping::new(),
                };
                ConfigValue::Mapping(recursive_merge(base_map, overlay_map))
            }
            other => other,
        };
        base.insert(key, merged_value);
    }
    base
}

/// Merge with the given strategy.
pub fn merge(
    strategy: MergeStrategy,
    base: ConfigMapping,
    overlay: ConfigMapping,
) -> ConfigMapping {
    match strategy {
        MergeStrategy::Flat => flat_merge(base, overlay),
        MergeStrategy::Recursive => recursive_merge(base, overlay),
    }
}

/// Merge mappings in order, with later mappings taking precedence.
///
/// Equivalent to folding `merge` over the list, starting from an empty mapping.
pub fn merge_all(
    strategy: MergeStrategy,
    mappings: impl IntoIterator<Item = ConfigMapping>,
) -> ConfigMapping {
    mappings
        .into_iter()
        .fold(ConfigMapping::new(), |acc, next| merge(strategy, acc, next))
}
