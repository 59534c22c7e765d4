//! Configuration for the catalog pipeline.
//!
//! An optional `pluginmaster.toml` in the working directory supplies
//! overrides. The `PROVIDER` env var and CLI flags override file values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PluginMasterError, Result};
use crate::types::STABLE_CHANNEL;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "pluginmaster.toml";

/// Public artifact host used when no provider is configured.
pub const DEFAULT_PROVIDER: &str =
    "https://raw.githubusercontent.com/codedynamis/PluginRepository/master/dist";

// ---------------------------------------------------------------------------
// Config structs (matching pluginmaster.toml schema)
// ---------------------------------------------------------------------------

/// Top-level config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the distribution tree (contains `<channel>/<plugin>/`).
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,

    /// Catalog file name, written directly under `dist_dir`.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Base URL that download links are built from.
    #[serde(default = "default_provider")]
    pub provider: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
            output_file: default_output_file(),
            provider: default_provider(),
        }
    }
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}
fn default_output_file() -> String {
    "pluginmaster.json".into()
}
fn default_provider() -> String {
    DEFAULT_PROVIDER.into()
}

/// Overrides taken from the environment and the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dist_dir: Option<PathBuf>,
    pub output_file: Option<String>,
    pub provider: Option<String>,
}

// ---------------------------------------------------------------------------
// Runtime config (merged and validated)
// ---------------------------------------------------------------------------

/// Resolved settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Root of the distribution tree.
    pub dist_dir: PathBuf,
    /// Channel whose plugins are collected.
    pub channel: String,
    /// Full path of the catalog file.
    pub output_path: PathBuf,
    /// Provider base URL without a trailing slash.
    pub provider: String,
}

impl CatalogConfig {
    /// Merge overrides into `config` and validate the result.
    pub fn resolve(config: AppConfig, overrides: ConfigOverrides) -> Result<Self> {
        let dist_dir = overrides.dist_dir.unwrap_or(config.dist_dir);
        let output_file = overrides.output_file.unwrap_or(config.output_file);
        let provider = overrides.provider.unwrap_or(config.provider);

        if output_file.is_empty() {
            return Err(PluginMasterError::config("output_file must not be empty"));
        }

        Ok(Self {
            output_path: dist_dir.join(output_file),
            dist_dir,
            channel: STABLE_CHANNEL.to_string(),
            provider: normalize_provider(&provider)?,
        })
    }

    /// Directory holding the channel's plugin directories.
    pub fn channel_dir(&self) -> PathBuf {
        self.dist_dir.join(&self.channel)
    }
}

/// Check that `provider` is an absolute URL and strip any trailing slash.
pub fn normalize_provider(provider: &str) -> Result<String> {
    Url::parse(provider).map_err(|e| {
        PluginMasterError::config(format!("provider '{provider}' is not a valid URL: {e}"))
    })?;
    Ok(provider.trim_end_matches('/').to_string())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load `pluginmaster.toml` from the working directory. Returns defaults if
/// the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = Path::new(CONFIG_FILE_NAME);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(path)
}

/// Load the config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PluginMasterError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PluginMasterError::config(format!("failed to parse {}: {e}", path.display()))
    })
}
