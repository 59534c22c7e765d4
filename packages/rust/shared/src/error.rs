//! Error types for the plugin catalog pipeline.
//!
//! Library crates use [`PluginMasterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all catalog operations.
///
/// Every variant is fatal for the run: the pipeline never writes a partial
/// catalog.
#[derive(Debug, thiserror::Error)]
pub enum PluginMasterError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A declared manifest lacks a required field.
    #[error("plugin {plugin}: missing required field `{field}`")]
    MissingField { plugin: String, field: String },

    /// A manifest file exists but is not a valid manifest record.
    #[error("parse error in {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A provenance file is unreadable as structured data, or a timestamp
    /// failed every accepted format.
    #[error("plugin {plugin}: malformed provenance while deriving {step}: {message}")]
    MalformedProvenance {
        plugin: String,
        step: String,
        message: String,
    },

    /// `event.json` matched no known trigger shape and `commits.json` is absent.
    #[error(
        "plugin {plugin}: event.json matches no known trigger shape and commits.json is missing"
    )]
    UnexpectedEventShape { plugin: String },

    /// Two plugin directories declare the same `InternalName`.
    #[error("duplicate plugin `{internal_name}` declared in {first:?} and {second:?}")]
    DuplicatePlugin {
        internal_name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The catalog could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PluginMasterError>;

impl PluginMasterError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a manifest parse error for the file at `path`.
    pub fn parse(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a missing-field error for `plugin`.
    pub fn missing_field(plugin: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            plugin: plugin.into(),
            field: field.into(),
        }
    }

    /// Create a malformed-provenance error for `plugin` at derivation `step`.
    pub fn provenance(
        plugin: impl Into<String>,
        step: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::MalformedProvenance {
            plugin: plugin.into(),
            step: step.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
