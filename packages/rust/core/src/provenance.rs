//! Build-provenance files that sit next to a plugin's manifest.
//!
//! ```text
//! <plugin dir>/
//! ├── commits.json   optional, [{sha, commit: {message, author: {name, date}}}]
//! ├── event.json     optional, the CI trigger event payload
//! └── latest.zip     optional, its mtime is the last-resort timestamp
//! ```
//!
//! Missing files are never errors. Files that exist but cannot be read as
//! the expected structure are [`PluginMasterError::MalformedProvenance`].

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use pluginmaster_shared::{PluginMasterError, Result};

pub const COMMITS_FILE: &str = "commits.json";
pub const EVENT_FILE: &str = "event.json";
pub const ARCHIVE_FILE: &str = "latest.zip";

/// Derivation steps, used to label provenance errors.
pub mod step {
    pub const CHANGELOG: &str = "changelog";
    pub const REPO_URL: &str = "repo_url";
    pub const LAST_UPDATED: &str = "last_updated";
}

// ---------------------------------------------------------------------------
// Commit list
// ---------------------------------------------------------------------------

/// One entry of `commits.json` (GitHub commit API shape).
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub date: String,
}

/// Contents of `commits.json`.
#[derive(Debug, Clone)]
pub enum CommitList {
    /// Newest-first commit records.
    Commits(Vec<CommitRecord>),
    /// Valid JSON that is not an array.
    NotASequence,
}

// ---------------------------------------------------------------------------
// Trigger event
// ---------------------------------------------------------------------------

/// What triggered the build, classified by field presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventShape {
    /// `on: push`, carries `head_commit.timestamp`.
    Push { timestamp: String },
    /// `on: release`, carries `created_at`.
    Release { created_at: String },
    /// `on: workflow_dispatch` or anything else; the commit list dates it.
    Manual,
}

/// Contents of `event.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    /// `repository.html_url`; `None` when absent or null.
    pub repository_url: Option<String>,
    pub shape: EventShape,
}

impl TriggerEvent {
    /// Classify a parsed event payload. `head_commit` wins over
    /// `created_at`; anything else is [`EventShape::Manual`].
    pub fn classify(plugin: &str, event: &Value) -> Result<Self> {
        let Some(obj) = event.as_object() else {
            return Ok(Self {
                repository_url: None,
                shape: EventShape::Manual,
            });
        };

        let repository_url = match obj.get("repository") {
            None => None,
            Some(repo) => match repo.get("html_url") {
                None => {
                    return Err(PluginMasterError::provenance(
                        plugin,
                        step::REPO_URL,
                        "event.json `repository` has no `html_url`",
                    ));
                }
                Some(Value::Null) => None,
                Some(Value::String(url)) => Some(url.clone()),
                Some(_) => {
                    return Err(PluginMasterError::provenance(
                        plugin,
                        step::REPO_URL,
                        "`repository.html_url` is not a string",
                    ));
                }
            },
        };

        let shape = if let Some(head_commit) = obj.get("head_commit") {
            let timestamp = head_commit.get("timestamp");
            EventShape::Push {
                timestamp: required_str(plugin, timestamp, "head_commit.timestamp")?,
            }
        } else if let Some(created_at) = obj.get("created_at") {
            EventShape::Release {
                created_at: required_str(plugin, Some(created_at), "created_at")?,
            }
        } else {
            EventShape::Manual
        };

        Ok(Self {
            repository_url,
            shape,
        })
    }
}

fn required_str(plugin: &str, value: Option<&Value>, field: &str) -> Result<String> {
    value.and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
        PluginMasterError::provenance(
            plugin,
            step::LAST_UPDATED,
            format!("event.json `{field}` is missing or not a string"),
        )
    })
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Every provenance source found in one plugin directory.
#[derive(Debug, Clone)]
pub struct ProvenanceBundle {
    /// Directory the files were read from.
    pub dir: PathBuf,
    pub commits: Option<CommitList>,
    pub event: Option<TriggerEvent>,
    /// Modification time of `latest.zip`.
    pub archive_mtime: Option<SystemTime>,
}

impl ProvenanceBundle {
    /// Read whatever provenance files exist in `dir`.
    pub fn load(plugin: &str, dir: &Path) -> Result<Self> {
        let commits = match read_json(plugin, &dir.join(COMMITS_FILE), step::CHANGELOG)? {
            None => None,
            Some(Value::Array(items)) => {
                let records = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<std::result::Result<Vec<CommitRecord>, _>>()
                    .map_err(|e| {
                        PluginMasterError::provenance(
                            plugin,
                            step::CHANGELOG,
                            format!("invalid commit record in commits.json: {e}"),
                        )
                    })?;
                Some(CommitList::Commits(records))
            }
            Some(_) => Some(CommitList::NotASequence),
        };

        let event = read_json(plugin, &dir.join(EVENT_FILE), step::LAST_UPDATED)?
            .map(|value| TriggerEvent::classify(plugin, &value))
            .transpose()?;

        let archive_path = dir.join(ARCHIVE_FILE);
        let archive_mtime = if archive_path.exists() {
            let modified = std::fs::metadata(&archive_path).and_then(|meta| meta.modified());
            Some(modified.map_err(|e| PluginMasterError::io(&archive_path, e))?)
        } else {
            None
        };

        debug!(
            plugin,
            commits = commits.is_some(),
            event = event.is_some(),
            archive = archive_mtime.is_some(),
            "loaded provenance"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            commits,
            event,
            archive_mtime,
        })
    }
}

/// Parse `path` as JSON if it exists.
fn read_json(plugin: &str, path: &Path, step: &str) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => {
            PluginMasterError::provenance(plugin, step, format!("{}: {e}", path.display()))
        }
        _ => PluginMasterError::io(path, e),
    })?;
    let value = serde_json::from_str(&content).map_err(|e| {
        PluginMasterError::provenance(plugin, step, format!("{}: {e}", path.display()))
    })?;
    Ok(Some(value))
}

// ---------------------------------------------------------------------------
// Time helpers
// ---------------------------------------------------------------------------

/// Naive date-time layouts tried after RFC 3339, extended then basic.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

/// Date-only layouts, read as midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Parse a provenance timestamp into Unix epoch seconds.
///
/// Accepts RFC 3339 and the wider ISO-8601 forms GitHub payloads and hand
/// edited files use: minute precision, a space instead of `T`, basic
/// (`20240101T000000Z`) layout, and bare dates. A trailing `Z` or numeric
/// offset is honoured; without one the time is read as UTC. The literal
/// `YYYY-MM-DDTHH:MM:SSZ` GitHub layout is a subset of these.
pub fn parse_timestamp(plugin: &str, raw: &str) -> Result<u64> {
    let parsed = parse_iso8601(raw).ok_or_else(|| {
        PluginMasterError::provenance(
            plugin,
            step::LAST_UPDATED,
            format!("unparsable timestamp '{raw}'"),
        )
    })?;

    u64::try_from(parsed).map_err(|_| {
        PluginMasterError::provenance(
            plugin,
            step::LAST_UPDATED,
            format!("timestamp '{raw}' predates the Unix epoch"),
        )
    })
}

fn parse_iso8601(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }

    let Some(sep) = raw.find(['T', 't', ' ']) else {
        return DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
            .map(|date| date.and_time(NaiveTime::MIN).and_utc().timestamp());
    };

    let (date, time) = raw.split_at(sep);
    let (time, offset_secs) = split_offset(&time[1..])?;
    let naive = format!("{date}T{time}");

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&naive, fmt).ok())
        .map(|dt| dt.and_utc().timestamp() - offset_secs)
}

/// Split a trailing `Z` or `±HH[:MM[:SS]]` off the time part.
fn split_offset(time: &str) -> Option<(&str, i64)> {
    if let Some(rest) = time.strip_suffix(['Z', 'z']) {
        return Some((rest, 0));
    }
    let Some(idx) = time.rfind(['+', '-']) else {
        return Some((time, 0));
    };

    let (clock, offset) = time.split_at(idx);
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) || !matches!(digits.len(), 2 | 4 | 6) {
        return None;
    }

    let field =
        |range: std::ops::Range<usize>| digits.get(range).map_or(Ok(0), str::parse::<i64>);
    let secs = field(0..2).ok()? * 3600 + field(2..4).ok()? * 60 + field(4..6).ok()?;
    Some((clock, sign * secs))
}

/// Whole seconds since the Unix epoch for a filesystem time.
pub fn epoch_seconds(plugin: &str, time: SystemTime) -> Result<u64> {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| {
            PluginMasterError::provenance(
                plugin,
                step::LAST_UPDATED,
                "latest.zip mtime predates the Unix epoch",
            )
        })
}
