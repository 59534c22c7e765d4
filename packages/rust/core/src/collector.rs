//! Manifest collection: scan a channel directory and load each plugin's
//! declared manifest.
//!
//! A plugin directory `P` contributes a manifest only when it contains
//! `P/P.json`. Directories without one (partial uploads, stray folders) are
//! skipped silently.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use pluginmaster_shared::{PluginManifest, PluginMasterError, Result, fields};

/// A manifest together with the directory it was loaded from.
#[derive(Debug, Clone)]
pub struct CollectedPlugin {
    /// Directory the manifest was found in.
    pub dir: PathBuf,
    /// The declared manifest, untouched.
    pub manifest: PluginManifest,
}

/// Collected manifests keyed by `InternalName`.
pub type ManifestMap = BTreeMap<String, CollectedPlugin>;

/// Load every plugin manifest under `channel_dir`.
///
/// Directories are visited in lexicographic order of their names. A second
/// directory declaring an `InternalName` that was already collected fails the
/// run with [`PluginMasterError::DuplicatePlugin`].
#[instrument(skip_all, fields(channel_dir = %channel_dir.display()))]
pub fn collect_manifests(channel_dir: &Path) -> Result<ManifestMap> {
    let mut manifests = ManifestMap::new();

    for dir_name in plugin_dir_names(channel_dir)? {
        let dir = channel_dir.join(&dir_name);
        let manifest_path = dir.join(format!("{dir_name}.json"));
        if !manifest_path.is_file() {
            debug!(dir = %dir.display(), "no manifest, skipping");
            continue;
        }

        info!(plugin = %dir_name, "found plugin");
        let manifest = read_manifest(&manifest_path)?;
        let internal_name = manifest
            .internal_name()
            .ok_or_else(|| PluginMasterError::missing_field(&dir_name, fields::INTERNAL_NAME))?
            .to_string();

        if internal_name != dir_name {
            warn!(
                plugin = %internal_name,
                dir = %dir_name,
                "InternalName differs from directory name"
            );
        }

        if let Some(existing) = manifests.get(&internal_name) {
            return Err(PluginMasterError::DuplicatePlugin {
                internal_name,
                first: existing.dir.clone(),
                second: dir,
            });
        }

        manifests.insert(internal_name, CollectedPlugin { dir, manifest });
    }

    info!(count = manifests.len(), "manifest collection complete");
    Ok(manifests)
}

/// Read and parse a single manifest file. The top level must be an object.
pub fn read_manifest(path: &Path) -> Result<PluginManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| PluginMasterError::io(path, e))?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| PluginMasterError::parse(path, e.to_string()))?;

    match value {
        Value::Object(map) => Ok(PluginManifest::from(map)),
        other => Err(PluginMasterError::parse(
            path,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
    }
}

/// Names of the entries directly under `channel_dir`, sorted.
fn plugin_dir_names(channel_dir: &Path) -> Result<Vec<String>> {
    let entries =
        std::fs::read_dir(channel_dir).map_err(|e| PluginMasterError::io(channel_dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PluginMasterError::io(channel_dir, e))?;
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => warn!(name = ?raw, "skipping non UTF-8 directory name"),
        }
    }
    names.sort();
    Ok(names)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
