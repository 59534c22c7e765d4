//! Core domain types for plugin manifests and the master catalog.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Release channel whose plugins make up the catalog.
pub const STABLE_CHANNEL: &str = "stable";

/// Author name of the CI bot whose commits never show up in changelogs.
pub const AUTOMATION_AUTHOR: &str = "github-actions";

/// Well-known manifest field names.
pub mod fields {
    pub const INTERNAL_NAME: &str = "InternalName";
    pub const NAME: &str = "Name";
    pub const AUTHOR: &str = "Author";
    pub const ASSEMBLY_VERSION: &str = "AssemblyVersion";
    pub const REPO_URL: &str = "RepoUrl";
    pub const CHANGELOG: &str = "Changelog";
    pub const IS_HIDE: &str = "IsHide";
    pub const IS_TESTING_EXCLUSIVE: &str = "IsTestingExclusive";
    pub const LAST_UPDATED: &str = "LastUpdated";
    pub const DOWNLOAD_LINK_INSTALL: &str = "DownloadLinkInstall";
}

// ---------------------------------------------------------------------------
// PluginManifest
// ---------------------------------------------------------------------------

/// A plugin's manifest record.
///
/// Manifests carry arbitrary fields beyond the well-known ones, so the record
/// is an open map rather than a fixed struct. `serde_json::Map` keeps keys
/// sorted, which gives the catalog its alphabetical key order for free.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginManifest(pub Map<String, Value>);

impl PluginManifest {
    /// Look up a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Look up a field, treating absence as JSON `null`.
    pub fn get_or_null(&self, field: &str) -> Value {
        self.0.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// The `InternalName` identity key, if present and a string.
    pub fn internal_name(&self) -> Option<&str> {
        self.get(fields::INTERNAL_NAME).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for PluginManifest {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
