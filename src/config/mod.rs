//! Configuration module for cbuilder
//!
//! Provides XDG-compliant layered configuration loading. Path values
//! such as the workspace root are expanded with `shellexpand`.

pub mod loader;
pub mod model;

pub use loader::{config_paths, load_config, LoadedConfig};
pub use model::*;
