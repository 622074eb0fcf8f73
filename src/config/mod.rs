//! Layered configuration resolution.
//!
//! Merges configuration from four sources, lowest to highest priority:
//! 1. **Default** - Built-in defaults (embedded, or a file named in the options)
//! 2. **File** - A user YAML file, with its `includes`
//! 3. **Variable** - A mapping supplied by the embedding program
//! 4. **Console** - Command-line flags that were actually given
//!
//! ## Merge Strategy
//! - `Flat` (default): a higher source replaces whole top-level values
//! - `Recursive`: nested mappings are combined key by key
//!
//! ## Includes
//! File names listed under `includes` are resolved against the includes
//! directory (default `./config/`) and merged beneath the including file.

mod decode;
mod loader;
mod merge;
mod port;
mod resolver;
mod types;

pub use decode::{decode_str, parse_float_token};
pub use loader::{load_config_file, load_defaults};
pub use merge::{flat_merge, merge, merge_all, recursive_merge};
pub use port::{
    DEFAULT_PORT_RANGE, PortAllocation, PortAllocator, PortProbe, TcpProbe, is_port_in_use,
};
pub use resolver::{ResolveRequest, Resolver, run_dir_of};
pub use types::*;
