//! Build-log recording
//!
//! Read-modify-write of the shared build-log section, same as the
//! testimonials section: fetch, append with retention, create or update,
//! publish.

use serde_json::Value;
use tsync_common::build_log::{append_with_retention, BuildLogEntry};

use crate::error::SyncResult;
use crate::types::{ContentStore, EntryRef, BUILD_LOG_SECTION, BUILD_LOG_TITLE};

/// Service name written into this tool's build-log records
pub const SERVICE_NAME: &str = "tsync";

/// Append `entry` to the build log and publish it
///
/// Returns the number of records in the log after the append.
pub async fn record_build_log(store: &dyn ContentStore, entry: BuildLogEntry) -> SyncResult<usize> {
    let section = store.fetch_section(BUILD_LOG_SECTION).await?;
    let existing: Vec<Value> = section.decode_content()?;

    let record = serde_json::to_value(&entry).map_err(tsync_common::Error::from)?;
    let log = append_with_retention(&existing, &entry.service, record);
    let entries = log.len();
    let content = Value::Array(log);

    let written: EntryRef = if section.exists() {
        store.update_section(&section, content).await?
    } else {
        store
            .create_section(BUILD_LOG_SECTION, BUILD_LOG_TITLE, content)
            .await?
    };
    store.publish(&written).await?;

    tracing::info!(entries, "Build log updated");
    Ok(entries)
}
