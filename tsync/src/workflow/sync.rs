//! Sync orchestrator
//!
//! **Algorithm:**
//! 1. Fetch recommendations from the source (none → stop, store untouched)
//! 2. Fetch the stored testimonials section
//! 3. Merge, or replace in force mode (merge with nothing new → stop)
//! 4. Enrich only the newly added entries: translate the quote, move the
//!    avatar to the asset store
//! 5. Create or update the section, then publish it
//! 6. Append a build-log record
//!
//! Enrichment and build-log failures degrade the run instead of aborting it.
//! Everything else propagates as [`SyncError`].

use chrono::Utc;
use tracing::{debug, info, warn};
use tsync_common::build_log::{BuildLogEntry, TriggeredBy};
use tsync_common::{reconcile, MergeOutcome, SyncMode, Testimonial};

use super::build_log::{record_build_log, SERVICE_NAME};
use crate::error::{SyncError, SyncResult};
use crate::types::{
    AssetStore, ContentStore, EntryRef, RecommendationSource, Translator, TESTIMONIALS_SECTION,
    TESTIMONIALS_TITLE,
};

/// Per-run options, built once from the run configuration
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Profile whose recommendations are synced
    pub profile: String,
    pub mode: SyncMode,
    pub triggered_by: TriggeredBy,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The source returned nothing usable; the store was not touched
    NothingScraped,
    /// Merge mode found no new recommendations; the store was not touched
    UpToDate,
    /// The section was written and published
    Synced,
}

/// Summary of one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Testimonials in the section after the run
    pub total: usize,
    pub newly_added: usize,
    pub skipped_duplicates: usize,
    pub skipped_invalid: usize,
    pub entry_id: Option<String>,
    pub version: Option<u64>,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    fn unchanged(outcome: SyncOutcome, total: usize, entry_id: Option<String>, version: Option<u64>) -> Self {
        Self {
            total,
            newly_added: 0,
            skipped_duplicates: 0,
            skipped_invalid: 0,
            entry_id,
            version,
            outcome,
        }
    }
}

/// Orchestrates one sync run over the collaborator traits
pub struct SyncWorkflow<'a> {
    store: &'a dyn ContentStore,
    assets: &'a dyn AssetStore,
    source: &'a dyn RecommendationSource,
    translator: Option<&'a dyn Translator>,
}

impl<'a> SyncWorkflow<'a> {
    pub fn new(
        store: &'a dyn ContentStore,
        assets: &'a dyn AssetStore,
        source: &'a dyn RecommendationSource,
    ) -> Self {
        Self {
            store,
            assets,
            source,
            translator: None,
        }
    }

    /// Translate the quotes of newly added entries
    pub fn with_translator(mut self, translator: &'a dyn Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    pub async fn run(&self, options: &SyncOptions) -> SyncResult<SyncReport> {
        let profile = options.profile.trim();
        if profile.is_empty() {
            return Err(SyncError::Config("profile must not be empty".to_string()));
        }

        info!(profile = %profile, "Fetching recommendations");
        let scraped = self.source.fetch_recommendations(profile).await?;
        info!(count = scraped.len(), "Found recommendations");

        if scraped.is_empty() {
            warn!("No recommendations found, nothing to sync");
            return Ok(SyncReport::unchanged(SyncOutcome::NothingScraped, 0, None, None));
        }

        let section = self.store.fetch_section(TESTIMONIALS_SECTION).await?;
        let existing: Vec<Testimonial> = section.decode_content()?;
        info!(
            existing = existing.len(),
            entry_id = section.entry_id.as_deref().unwrap_or("<none>"),
            version = section.version,
            "Loaded stored testimonials"
        );

        if options.mode == SyncMode::Replace {
            info!("Force mode: replacing all testimonials");
        }

        let stored_version = section.exists().then_some(section.version);
        let mut outcome = reconcile(options.mode, &existing, &scraped);

        if outcome.merged.is_empty() {
            // Replace with nothing valid would wipe the section
            warn!(
                skipped_invalid = outcome.skipped_invalid,
                "No valid recommendations to store, leaving section untouched"
            );
            return Ok(SyncReport::unchanged(
                SyncOutcome::NothingScraped,
                existing.len(),
                section.entry_id,
                stored_version,
            ));
        }

        if options.mode == SyncMode::Merge && !outcome.has_new_entries() {
            info!("No new recommendations to add, everything is up to date");
            return Ok(SyncReport {
                skipped_duplicates: outcome.skipped_duplicates,
                skipped_invalid: outcome.skipped_invalid,
                ..SyncReport::unchanged(
                    SyncOutcome::UpToDate,
                    existing.len(),
                    section.entry_id,
                    stored_version,
                )
            });
        }

        info!(
            total = outcome.merged.len(),
            new = outcome.newly_added.len(),
            "Syncing testimonials"
        );

        self.enrich(&mut outcome).await;

        let content = serde_json::to_value(&outcome.merged).map_err(tsync_common::Error::from)?;
        let written: EntryRef = if section.exists() {
            self.store.update_section(&section, content).await?
        } else {
            info!("Creating new testimonials entry");
            self.store
                .create_section(TESTIMONIALS_SECTION, TESTIMONIALS_TITLE, content)
                .await?
        };
        self.store.publish(&written).await?;
        info!(entry_id = %written.id, version = written.version, "Successfully synced and published");

        let entry = BuildLogEntry::success(
            SERVICE_NAME,
            Utc::now(),
            options.triggered_by,
            options.mode == SyncMode::Replace,
            self.translator.is_some(),
            outcome.newly_added.len(),
            outcome.merged.len(),
        );
        if let Err(e) = record_build_log(self.store, entry).await {
            warn!(error = %e, kind = ?e.kind(), "Failed to record build log");
        }

        Ok(SyncReport {
            total: outcome.merged.len(),
            newly_added: outcome.newly_added.len(),
            skipped_duplicates: outcome.skipped_duplicates,
            skipped_invalid: outcome.skipped_invalid,
            entry_id: Some(written.id),
            version: Some(written.version),
            outcome: SyncOutcome::Synced,
        })
    }

    /// Translate and re-host avatars for the newly added entries, in place
    async fn enrich(&self, outcome: &mut MergeOutcome) {
        for entry in outcome.new_entries_mut() {
            if let Some(translator) = self.translator {
                match translator.translate(&entry.quote).await {
                    Ok(translated) => {
                        entry.quote = translated;
                        debug!(name = %entry.name, "Translated quote");
                    }
                    Err(e) => {
                        warn!(name = %entry.name, error = %e, "Translation failed, keeping original quote");
                    }
                }
            }

            if entry.avatar_url.is_empty() {
                continue;
            }

            match self.assets.upload_by_url(&entry.avatar_url, &entry.name).await {
                Ok(url) => entry.avatar_url = url,
                Err(e) => {
                    warn!(name = %entry.name, error = %e, "Avatar upload failed, dropping avatar");
                    entry.avatar_url.clear();
                }
            }
        }
    }
}
