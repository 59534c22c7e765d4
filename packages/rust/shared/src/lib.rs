//! Shared types, error model, and configuration for the plugin catalog.
//!
//! This crate is the foundation depended on by the other pluginmaster crates.
//! It provides:
//! - [`PluginMasterError`] — the unified error type
//! - Domain types ([`PluginManifest`], well-known [`fields`])
//! - Configuration ([`AppConfig`], [`CatalogConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, CatalogConfig, ConfigOverrides, DEFAULT_PROVIDER, load_config,
    load_config_from, normalize_provider,
};
pub use error::{PluginMasterError, Result};
pub use types::{AUTOMATION_AUTHOR, PluginManifest, STABLE_CHANNEL, fields};
