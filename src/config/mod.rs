//! Configuration module for relq.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CacheSettings, CompilerSettings, MetadataSettings, Settings, SettingsError,
};
