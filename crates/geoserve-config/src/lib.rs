//! Configuration system for the geoserve WPS server.
//!
//! Provides TOML-based configuration with:
//! - `[server]` bind address and port
//! - `[session]` workspace root and per-session resource sizing
//! - `[processes]` script roots and extra catalog directories
//! - `[execution]` the policy behind `mode=auto`
//!
//! Config files are layered (user config dir, then project-local
//! `geoserve.toml`); CLI flags are applied on top by the binary.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigLayer, ConfigSource, LoadedConfig, load_config, load_config_file,
    load_config_with_options, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
