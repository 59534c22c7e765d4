//! Catalog writer: sort the enriched manifests and persist `pluginmaster.json`.

use std::path::Path;

use tracing::{debug, info, instrument};

use pluginmaster_shared::{PluginManifest, PluginMasterError, Result};

/// Sort manifests ascending by `InternalName` (ordinal string comparison).
pub fn sort_catalog(manifests: &mut [PluginManifest]) {
    manifests.sort_by(|a, b| a.internal_name().cmp(&b.internal_name()));
}

/// Render the catalog document: a JSON array with alphabetical keys and
/// two-space indentation, no trailing newline.
pub fn render_catalog(manifests: &[PluginManifest]) -> Result<String> {
    serde_json::to_string_pretty(manifests)
        .map_err(|e| PluginMasterError::Serialization(e.to_string()))
}

/// Sort `manifests` and write them to `path`, replacing any previous catalog.
///
/// The document is written to a temp file beside `path` and renamed into
/// place, so readers never observe a half-written catalog.
#[instrument(skip_all, fields(path = %path.display(), count = manifests.len()))]
pub fn write_catalog(path: &Path, mut manifests: Vec<PluginManifest>) -> Result<usize> {
    sort_catalog(&mut manifests);
    let json = render_catalog(&manifests)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| PluginMasterError::config(format!("{} is not a file path", path.display())))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, json).map_err(|e| PluginMasterError::io(&temp, e))?;
    debug!(temp = %temp.display(), "wrote temp catalog");

    std::fs::rename(&temp, path).map_err(|e| PluginMasterError::io(path, e))?;

    info!(count = manifests.len(), "catalog written");
    Ok(manifests.len())
}
