//! Build-log records
//!
//! Several automation services share one "build log" section in the content
//! store. Each run appends a record of what it did; each service keeps only
//! its few most recent records and never touches another service's.
//!
//! Stored records stay raw JSON values: only the `service` field is read, so
//! records written by other services keep every field they carry.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// Records kept per service after an append, the new one included
pub const MAX_ENTRIES_PER_SERVICE: usize = 3;

/// Who started the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggeredBy {
    Local,
    GithubActions,
}

impl TriggeredBy {
    /// Detect from the CI environment flag (`GITHUB_ACTIONS=true`)
    pub fn detect(github_actions: Option<&str>) -> Self {
        match github_actions {
            Some("true") => Self::GithubActions,
            _ => Self::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::GithubActions => "github-actions",
        }
    }
}

/// One build-log record written by this tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildLogEntry {
    pub service: String,
    pub timestamp: String,
    pub triggered_by: String,
    pub force_update: bool,
    pub translation_used: bool,
    pub new_added: usize,
    pub total_after_sync: usize,
    pub status: String,
}

impl BuildLogEntry {
    /// Successful-run record stamped at `now`
    pub fn success(
        service: &str,
        now: DateTime<Utc>,
        triggered_by: TriggeredBy,
        force_update: bool,
        translation_used: bool,
        new_added: usize,
        total_after_sync: usize,
    ) -> Self {
        Self {
            service: service.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            triggered_by: triggered_by.as_str().to_string(),
            force_update,
            translation_used,
            new_added,
            total_after_sync,
            status: "success".to_string(),
        }
    }
}

/// Service name of a stored record, if it has one
pub fn record_service(record: &Value) -> Option<&str> {
    record.get("service").and_then(Value::as_str)
}

/// Append `entry` to the log, trimming `service`'s history
///
/// Records of other services come first, unchanged and in their stored
/// order. `service` keeps its `MAX_ENTRIES_PER_SERVICE - 1` most recent prior
/// records, followed by `entry`.
pub fn append_with_retention(existing: &[Value], service: &str, entry: Value) -> Vec<Value> {
    let (own, others): (Vec<&Value>, Vec<&Value>) = existing
        .iter()
        .partition(|record| record_service(record) == Some(service));

    let keep = MAX_ENTRIES_PER_SERVICE - 1;
    let own_kept = &own[own.len().saturating_sub(keep)..];

    let mut log = Vec::with_capacity(others.len() + own_kept.len() + 1);
    log.extend(others.into_iter().cloned());
    log.extend(own_kept.iter().map(|record| (*record).clone()));
    log.push(entry);
    log
}
