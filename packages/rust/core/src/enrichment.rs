//! Metadata enrichment.
//!
//! Derives `Changelog`, `RepoUrl` and `LastUpdated` for each collected
//! manifest from its provenance files, then merges them with the fixed
//! channel overrides into a copy of the declared record. Unknown fields pass
//! through untouched.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info, instrument};

use pluginmaster_shared::{
    AUTOMATION_AUTHOR, CatalogConfig, PluginManifest, PluginMasterError, Result, fields,
};

use crate::collector::ManifestMap;
use crate::provenance::{
    ARCHIVE_FILE, CommitList, EventShape, ProvenanceBundle, epoch_seconds, parse_timestamp, step,
};

/// Length of the abbreviated sha shown in changelog lines.
const SHORT_SHA_LEN: usize = 7;

/// Settings shared by every enrichment in a run.
#[derive(Debug, Clone)]
pub struct EnrichmentContext {
    /// Directory whose `<InternalName>/` subdirectories hold provenance.
    pub channel_dir: PathBuf,
    /// Channel name, part of the download link.
    pub channel: String,
    /// Provider base URL without a trailing slash.
    pub provider: String,
}

impl From<&CatalogConfig> for EnrichmentContext {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            channel_dir: config.channel_dir(),
            channel: config.channel.clone(),
            provider: config.provider.clone(),
        }
    }
}

impl EnrichmentContext {
    /// `<provider>/<channel>/<key>/latest.zip`
    pub fn download_link(&self, key: &str) -> String {
        format!("{}/{}/{key}/{ARCHIVE_FILE}", self.provider, self.channel)
    }
}

/// Enrich every collected manifest. Stops at the first error.
#[instrument(skip_all, fields(plugins = manifests.len()))]
pub fn enrich_all(manifests: &ManifestMap, ctx: &EnrichmentContext) -> Result<Vec<PluginManifest>> {
    let enriched = manifests
        .iter()
        .map(|(key, collected)| enrich_manifest(key, &collected.manifest, ctx))
        .collect::<Result<Vec<_>>>()?;

    info!(count = enriched.len(), "enrichment complete");
    Ok(enriched)
}

/// Build the catalog record for one plugin.
pub fn enrich_manifest(
    key: &str,
    declared: &PluginManifest,
    ctx: &EnrichmentContext,
) -> Result<PluginManifest> {
    let bundle = ProvenanceBundle::load(key, &ctx.channel_dir.join(key))?;

    let assembly_version = match declared.get(fields::ASSEMBLY_VERSION) {
        None | Some(Value::Null) => {
            return Err(PluginMasterError::missing_field(key, fields::ASSEMBLY_VERSION));
        }
        Some(version) => version.clone(),
    };

    let changelog = derive_changelog(&bundle);
    let repo_url = match derive_repo_url(&bundle) {
        Some(url) if !url.is_empty() => Value::String(url),
        _ => declared.get_or_null(fields::REPO_URL),
    };
    let last_updated = derive_last_updated(key, &bundle)?;

    let mut manifest = declared.clone();
    manifest.set(fields::CHANGELOG, changelog);
    manifest.set(fields::IS_HIDE, false);
    manifest.set(fields::REPO_URL, repo_url);
    manifest.set(fields::ASSEMBLY_VERSION, assembly_version);
    manifest.set(fields::IS_TESTING_EXCLUSIVE, false);
    manifest.set(fields::LAST_UPDATED, last_updated);
    manifest.set(fields::DOWNLOAD_LINK_INSTALL, ctx.download_link(key));
    manifest.set(fields::NAME, declared.get_or_null(fields::NAME));
    manifest.set(fields::AUTHOR, declared.get_or_null(fields::AUTHOR));
    manifest.set(fields::INTERNAL_NAME, declared.get_or_null(fields::INTERNAL_NAME));

    debug!(plugin = key, last_updated, "enriched manifest");
    Ok(manifest)
}

/// `"<sha7>: <message>"` per non-automation commit, newline-joined.
///
/// `None` when `commits.json` is absent, is not an array, or holds only
/// automation commits.
pub fn derive_changelog(bundle: &ProvenanceBundle) -> Option<String> {
    let Some(CommitList::Commits(commits)) = &bundle.commits else {
        return None;
    };

    let lines: Vec<String> = commits
        .iter()
        .filter(|c| c.commit.author.name != AUTOMATION_AUTHOR)
        .map(|c| {
            let short: String = c.sha.chars().take(SHORT_SHA_LEN).collect();
            format!("{short}: {}", c.commit.message)
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// `repository.html_url` from `event.json`, if any.
pub fn derive_repo_url(bundle: &ProvenanceBundle) -> Option<String> {
    bundle.event.as_ref()?.repository_url.clone()
}

/// Last-updated time in epoch seconds.
///
/// Without `event.json` the archive mtime is used, or `0` when there is no
/// archive either. With an event, a push uses `head_commit.timestamp`, a
/// release uses `created_at`, and anything else uses the newest commit's
/// author date, which then requires `commits.json`.
pub fn derive_last_updated(plugin: &str, bundle: &ProvenanceBundle) -> Result<u64> {
    let Some(event) = &bundle.event else {
        return match bundle.archive_mtime {
            Some(mtime) => epoch_seconds(plugin, mtime),
            None => Ok(0),
        };
    };

    let timestamp = match &event.shape {
        EventShape::Push { timestamp } => timestamp.as_str(),
        EventShape::Release { created_at } => created_at.as_str(),
        EventShape::Manual => match &bundle.commits {
            None => {
                return Err(PluginMasterError::UnexpectedEventShape {
                    plugin: plugin.to_string(),
                });
            }
            Some(CommitList::NotASequence) => {
                return Err(PluginMasterError::provenance(
                    plugin,
                    step::LAST_UPDATED,
                    "commits.json is not an array",
                ));
            }
            Some(CommitList::Commits(commits)) => match commits.first() {
                Some(newest) => newest.commit.author.date.as_str(),
                None => {
                    return Err(PluginMasterError::provenance(
                        plugin,
                        step::LAST_UPDATED,
                        "commits.json is empty",
                    ));
                }
            },
        },
    };

    parse_timestamp(plugin, timestamp)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::{Duration, UNIX_EPOCH};

    use serde_json::json;

    use super::*;
    use crate::provenance::{COMMITS_FILE, EVENT_FILE};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pm-enrichment-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn make_ctx(channel_dir: &Path) -> EnrichmentContext {
        EnrichmentContext {
            channel_dir: channel_dir.into(),
            channel: "stable".into(),
            provider: "https://cdn.example.com/dist".into(),
        }
    }

    fn plugin_dir(channel_dir: &Path, key: &str) -> PathBuf {
        let dir = channel_dir.join(key);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn manifest(value: Value) -> PluginManifest {
        serde_json::from_value(value).unwrap()
    }

    fn commit(sha: &str, message: &str, author: &str, date: &str) -> Value {
        json!({
            "sha": sha,
            "commit": { "message": message, "author": { "name": author, "date": date } }
        })
    }

    #[test]
    fn changelog_filters_automation_commits() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        let commits = json!([
            commit("aaaaaaa111", "Add feature", "dev", "2024-01-03T00:00:00Z"),
            commit("bbbbbbb222", "Bump version", "github-actions", "2024-01-02T00:00:00Z"),
            commit("ccccccc333", "Fix bug", "other", "2024-01-01T00:00:00Z"),
        ]);
        std::fs::write(dir.join(COMMITS_FILE), commits.to_string()).unwrap();

        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        assert_eq!(
            derive_changelog(&bundle).as_deref(),
            Some("aaaaaaa: Add feature\nccccccc: Fix bug")
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn changelog_all_automation_is_none() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        let commits = json!([commit("abcdef0123", "Bump", "github-actions", "2024-01-01T00:00:00Z")]);
        std::fs::write(dir.join(COMMITS_FILE), commits.to_string()).unwrap();

        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        assert_eq!(derive_changelog(&bundle), None);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn changelog_absent_or_not_a_list_is_none() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        assert_eq!(derive_changelog(&bundle), None);

        std::fs::write(dir.join(COMMITS_FILE), r#"{"message":"rate limited"}"#).unwrap();
        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        assert_eq!(derive_changelog(&bundle), None);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn event_timestamp_wins_over_commits() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        let event = json!({ "head_commit": { "timestamp": "2024-01-01T00:00:00Z" } });
        let commits = json!([commit("abcdef0123", "m", "dev", "2020-05-05T05:05:05Z")]);
        std::fs::write(dir.join(EVENT_FILE), event.to_string()).unwrap();
        std::fs::write(dir.join(COMMITS_FILE), commits.to_string()).unwrap();

        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        assert_eq!(derive_last_updated("p", &bundle).unwrap(), 1_704_067_200);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn manual_event_uses_newest_commit_date() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        let event = json!({ "inputs": {} });
        let commits = json!([
            commit("abcdef0123", "newest", "dev", "2024-01-01T00:00:00Z"),
            commit("0123abcdef", "older", "dev", "2023-01-01T00:00:00Z"),
        ]);
        std::fs::write(dir.join(EVENT_FILE), event.to_string()).unwrap();
        std::fs::write(dir.join(COMMITS_FILE), commits.to_string()).unwrap();

        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        assert_eq!(derive_last_updated("p", &bundle).unwrap(), 1_704_067_200);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn manual_event_without_commits_is_fatal() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        std::fs::write(dir.join(EVENT_FILE), r#"{"inputs":{}}"#).unwrap();

        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        let err = derive_last_updated("p", &bundle).unwrap_err();
        assert!(matches!(err, PluginMasterError::UnexpectedEventShape { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn manual_event_with_empty_commits_is_fatal() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        std::fs::write(dir.join(EVENT_FILE), r#"{"inputs":{}}"#).unwrap();
        std::fs::write(dir.join(COMMITS_FILE), "[]").unwrap();

        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        let err = derive_last_updated("p", &bundle).unwrap_err();
        assert!(err.to_string().contains("commits.json is empty"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn no_event_no_archive_is_zero() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");

        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        assert_eq!(derive_last_updated("p", &bundle).unwrap(), 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn no_event_uses_archive_mtime() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        let archive = std::fs::File::create(dir.join(ARCHIVE_FILE)).unwrap();
        archive
            .set_modified(UNIX_EPOCH + Duration::from_millis(1_700_000_000_900))
            .unwrap();
        drop(archive);

        let bundle = ProvenanceBundle::load("p", &dir).unwrap();
        assert_eq!(derive_last_updated("p", &bundle).unwrap(), 1_700_000_000);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn repo_url_falls_back_to_declared() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        std::fs::write(dir.join(EVENT_FILE), r#"{"created_at":"2023-06-01T12:00:00Z"}"#).unwrap();

        let declared = manifest(json!({
            "InternalName": "p",
            "AssemblyVersion": "1.0",
            "RepoUrl": "https://declared"
        }));
        let enriched = enrich_manifest("p", &declared, &make_ctx(&tmp)).unwrap();
        assert_eq!(enriched.get_or_null("RepoUrl"), json!("https://declared"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn repo_url_from_event_overrides_declared() {
        let tmp = temp_dir();
        let dir = plugin_dir(&tmp, "p");
        let event = json!({
            "repository": { "html_url": "https://github.com/o/p" },
            "head_commit": { "timestamp": "2024-01-01T00:00:00Z" }
        });
        std::fs::write(dir.join(EVENT_FILE), event.to_string()).unwrap();

        let declared = manifest(json!({
            "InternalName": "p",
            "AssemblyVersion": "1.0",
            "RepoUrl": "https://declared"
        }));
        let enriched = enrich_manifest("p", &declared, &make_ctx(&tmp)).unwrap();
        assert_eq!(enriched.get_or_null("RepoUrl"), json!("https://github.com/o/p"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn enrichment_applies_overrides_and_keeps_extra_fields() {
        let tmp = temp_dir();
        plugin_dir(&tmp, "p");

        let declared = manifest(json!({
            "InternalName": "p",
            "Name": "Plugin P",
            "AssemblyVersion": "1.2.3.4",
            "IsHide": true,
            "IsTestingExclusive": true,
            "Tags": ["ui", "chat"],
            "DalamudApiLevel": 9
        }));
        let enriched = enrich_manifest("p", &declared, &make_ctx(&tmp)).unwrap();

        assert_eq!(enriched.get_or_null("IsHide"), json!(false));
        assert_eq!(enriched.get_or_null("IsTestingExclusive"), json!(false));
        assert_eq!(enriched.get_or_null("AssemblyVersion"), json!("1.2.3.4"));
        assert_eq!(enriched.get_or_null("Name"), json!("Plugin P"));
        assert_eq!(enriched.get_or_null("Author"), Value::Null);
        assert!(enriched.get("Author").is_some());
        assert_eq!(enriched.get_or_null("Changelog"), Value::Null);
        assert_eq!(enriched.get_or_null("RepoUrl"), Value::Null);
        assert_eq!(enriched.get_or_null("LastUpdated"), json!(0));
        assert_eq!(
            enriched.get_or_null("DownloadLinkInstall"),
            json!("https://cdn.example.com/dist/stable/p/latest.zip")
        );
        assert_eq!(enriched.get_or_null("Tags"), json!(["ui", "chat"]));
        assert_eq!(enriched.get_or_null("DalamudApiLevel"), json!(9));

        // The declared record is left as it was.
        assert_eq!(declared.get_or_null("IsHide"), json!(true));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_assembly_version_is_fatal() {
        let tmp = temp_dir();
        plugin_dir(&tmp, "p");

        let declared = manifest(json!({ "InternalName": "p" }));
        let err = enrich_manifest("p", &declared, &make_ctx(&tmp)).unwrap_err();
        match err {
            PluginMasterError::MissingField { plugin, field } => {
                assert_eq!(plugin, "p");
                assert_eq!(field, "AssemblyVersion");
            }
            other => panic!("unexpected error: {other}"),
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn provenance_dir_may_be_missing_entirely() {
        let tmp = temp_dir();
        let declared = manifest(json!({ "InternalName": "ghost", "AssemblyVersion": "1.0" }));
        let enriched = enrich_manifest("ghost", &declared, &make_ctx(&tmp)).unwrap();
        assert_eq!(enriched.get_or_null("LastUpdated"), json!(0));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
