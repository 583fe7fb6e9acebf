//! Sync workflow tests against in-memory collaborators

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::{json, Value};
use tsync::services::{ContentfulError, GeminiError, LinkedInError};
use tsync::types::{
    AssetStore, ContentStore, EntryRef, RecommendationSource, SectionEntry, Translator,
    BUILD_LOG_SECTION, CONTENT_FIELD, TESTIMONIALS_SECTION,
};
use tsync::workflow::{SyncOptions, SyncOutcome, SyncWorkflow, SERVICE_NAME};
use tsync::{FailureKind, SyncError};
use tsync_common::build_log::TriggeredBy;
use tsync_common::document::{EntryFields, DEFAULT_LOCALE};
use tsync_common::{Recommendation, SyncMode, Testimonial};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeStore {
    sections: Mutex<HashMap<String, SectionEntry>>,
    published: Mutex<Vec<EntryRef>>,
    failing_sections: HashSet<String>,
}

impl FakeStore {
    fn with_section(self, section_id: &str, version: u64, fields: Value) -> Self {
        let entry = SectionEntry {
            entry_id: Some(format!("{}-entry", section_id)),
            version,
            fields: serde_json::from_value(fields).unwrap(),
        };
        self.sections.lock().unwrap().insert(section_id.to_string(), entry);
        self
    }

    fn failing(mut self, section_id: &str) -> Self {
        self.failing_sections.insert(section_id.to_string());
        self
    }

    fn section(&self, section_id: &str) -> Option<SectionEntry> {
        self.sections.lock().unwrap().get(section_id).cloned()
    }

    fn testimonials(&self) -> Vec<Testimonial> {
        self.section(TESTIMONIALS_SECTION)
            .map(|s| s.decode_content().unwrap())
            .unwrap_or_default()
    }

    fn build_log(&self) -> Vec<Value> {
        self.section(BUILD_LOG_SECTION)
            .map(|s| s.decode_content().unwrap())
            .unwrap_or_default()
    }

    fn published_ids(&self) -> Vec<String> {
        self.published.lock().unwrap().iter().map(|e| e.id.clone()).collect()
    }

    fn section_for_entry(&self, entry_id: &str) -> Option<String> {
        self.sections
            .lock()
            .unwrap()
            .iter()
            .find(|(_, s)| s.entry_id.as_deref() == Some(entry_id))
            .map(|(id, _)| id.clone())
    }
}

#[async_trait::async_trait]
impl ContentStore for FakeStore {
    async fn fetch_section(&self, section_id: &str) -> Result<SectionEntry, ContentfulError> {
        if self.failing_sections.contains(section_id) {
            return Err(ContentfulError::ApiError(500, "unavailable".to_string()));
        }
        Ok(self.section(section_id).unwrap_or_default())
    }

    async fn create_section(
        &self,
        section_id: &str,
        title: &str,
        content: Value,
    ) -> Result<EntryRef, ContentfulError> {
        let mut fields = EntryFields::new();
        fields.set_localized("sectionId", DEFAULT_LOCALE, &section_id).unwrap();
        fields.set_localized("title", DEFAULT_LOCALE, &title).unwrap();
        fields.set_localized(CONTENT_FIELD, DEFAULT_LOCALE, &content).unwrap();

        let entry = SectionEntry {
            entry_id: Some(format!("{}-entry", section_id)),
            version: 1,
            fields,
        };
        let reference = EntryRef {
            id: format!("{}-entry", section_id),
            version: 1,
        };
        self.sections.lock().unwrap().insert(section_id.to_string(), entry);
        Ok(reference)
    }

    async fn update_section(
        &self,
        entry: &SectionEntry,
        content: Value,
    ) -> Result<EntryRef, ContentfulError> {
        let entry_id = entry.entry_id.clone().unwrap();
        let section_id = self.section_for_entry(&entry_id).unwrap();

        let mut sections = self.sections.lock().unwrap();
        let stored = sections.get_mut(&section_id).unwrap();
        if stored.version != entry.version {
            return Err(ContentfulError::VersionConflict(entry_id));
        }

        stored.fields = entry.fields.with_localized(CONTENT_FIELD, DEFAULT_LOCALE, &content).unwrap();
        stored.version += 1;
        Ok(EntryRef {
            id: entry_id,
            version: stored.version,
        })
    }

    async fn publish(&self, entry: &EntryRef) -> Result<(), ContentfulError> {
        self.published.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

struct FakeSource {
    result: Result<Vec<Recommendation>, fn() -> LinkedInError>,
}

impl FakeSource {
    fn returning(recs: Vec<Recommendation>) -> Self {
        Self { result: Ok(recs) }
    }
}

#[async_trait::async_trait]
impl RecommendationSource for FakeSource {
    async fn fetch_recommendations(&self, _profile: &str) -> Result<Vec<Recommendation>, LinkedInError> {
        match &self.result {
            Ok(recs) => Ok(recs.clone()),
            Err(make) => Err(make()),
        }
    }
}

#[derive(Default)]
struct FakeAssets {
    failing_labels: HashSet<String>,
    uploads: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl AssetStore for FakeAssets {
    async fn upload_by_url(&self, image_url: &str, label: &str) -> Result<String, ContentfulError> {
        self.uploads.lock().unwrap().push(image_url.to_string());
        if self.failing_labels.contains(label) {
            return Err(ContentfulError::ProcessingTimeout(label.to_string()));
        }
        Ok(format!("https://images.example/{}.jpg", label.to_lowercase().replace(' ', "-")))
    }
}

#[derive(Default)]
struct FakeTranslator {
    failing: bool,
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str) -> Result<String, GeminiError> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failing {
            return Err(GeminiError::ApiError(503, "overloaded".to_string()));
        }
        Ok(format!("[en] {}", text))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn rec(name: &str, company: &str, quote: &str, avatar: &str) -> Recommendation {
    Recommendation {
        avatar_url: avatar.to_string(),
        ..Recommendation::new(name, company, quote)
    }
}

fn options(mode: SyncMode) -> SyncOptions {
    SyncOptions {
        profile: "janedoe".to_string(),
        mode,
        triggered_by: TriggeredBy::Local,
    }
}

fn stored_jane() -> Value {
    json!({
        "sectionId": {"en-US": "testimonials"},
        "title": {"en-US": "Testimonials"},
        "content": {"en-US": [
            {"name": "Jane", "role": "CTO", "company": "Acme", "quote": "q1",
             "avatarUrl": "https://images.example/jane.jpg"}
        ]},
        "heroImage": {"en-US": {"sys": {"type": "Link", "linkType": "Asset", "id": "hero"}}}
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_creates_section_when_missing() {
    let store = FakeStore::default();
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![
        rec("Jane", "Acme", "q1", ""),
        rec("Bob", "Beta", "q2", ""),
    ]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::Synced);
    assert_eq!(report.total, 2);
    assert_eq!(report.newly_added, 2);
    assert_eq!(report.entry_id.as_deref(), Some("testimonials-entry"));
    assert_eq!(report.version, Some(1));

    let names: Vec<String> = store.testimonials().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["Jane", "Bob"]);
    assert!(store.published_ids().contains(&"testimonials-entry".to_string()));
}

#[tokio::test]
async fn test_merge_appends_only_new_and_keeps_other_fields() {
    let store = FakeStore::default().with_section(TESTIMONIALS_SECTION, 5, stored_jane());
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![
        rec("jane ", "ACME", "quote2", ""),
        rec("Bob", "Beta", "q3", ""),
    ]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::Synced);
    assert_eq!(report.newly_added, 1);
    assert_eq!(report.skipped_duplicates, 1);
    assert_eq!(report.version, Some(6));

    let stored = store.testimonials();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].name, "Jane");
    assert_eq!(stored[0].quote, "q1");
    assert_eq!(stored[0].avatar_url, "https://images.example/jane.jpg");
    assert_eq!(stored[1].name, "Bob");

    let section = store.section(TESTIMONIALS_SECTION).unwrap();
    assert_eq!(
        section.fields.names().collect::<Vec<_>>(),
        vec!["sectionId", "title", "content", "heroImage"]
    );
    assert_eq!(section.fields.get("heroImage"), stored_jane().get("heroImage"));
}

#[tokio::test]
async fn test_merge_with_nothing_new_leaves_store_untouched() {
    let store = FakeStore::default().with_section(TESTIMONIALS_SECTION, 5, stored_jane());
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![rec("Jane", "Acme", "other quote", "https://media/x")]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::UpToDate);
    assert_eq!(report.total, 1);
    assert_eq!(report.skipped_duplicates, 1);
    assert_eq!(report.version, Some(5));
    assert!(store.published_ids().is_empty());
    assert!(assets.uploads.lock().unwrap().is_empty());
    assert!(store.section(BUILD_LOG_SECTION).is_none());
}

#[tokio::test]
async fn test_nothing_scraped_skips_store() {
    let store = FakeStore::default().failing(TESTIMONIALS_SECTION);
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Replace))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::NothingScraped);
    assert!(store.published_ids().is_empty());
}

#[tokio::test]
async fn test_force_replaces_and_enriches_everything() {
    let store = FakeStore::default().with_section(TESTIMONIALS_SECTION, 2, stored_jane());
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![
        rec("Carol", "Delta", "q4", "https://media/carol"),
        rec("carol", " delta", "dup", "https://media/carol2"),
        rec("Dan", "Echo", "q5", "https://media/dan"),
    ]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Replace))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::Synced);
    assert_eq!(report.total, 2);
    assert_eq!(report.newly_added, 2);
    assert_eq!(report.skipped_duplicates, 1);

    let stored = store.testimonials();
    assert_eq!(stored[0].name, "Carol");
    assert_eq!(stored[0].quote, "q4");
    assert_eq!(stored[0].avatar_url, "https://images.example/carol.jpg");
    assert_eq!(stored[1].avatar_url, "https://images.example/dan.jpg");
    assert_eq!(
        *assets.uploads.lock().unwrap(),
        vec!["https://media/carol".to_string(), "https://media/dan".to_string()]
    );
}

#[tokio::test]
async fn test_force_with_no_valid_records_keeps_section() {
    let store = FakeStore::default().with_section(TESTIMONIALS_SECTION, 2, stored_jane());
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![rec("  ", "Acme", "q", ""), rec("Bob", "Beta", " ", "")]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Replace))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::NothingScraped);
    assert_eq!(store.testimonials().len(), 1);
    assert!(store.published_ids().is_empty());
}

#[tokio::test]
async fn test_avatar_upload_only_for_new_entries() {
    let store = FakeStore::default().with_section(TESTIMONIALS_SECTION, 1, stored_jane());
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![
        rec("Jane", "Acme", "q1", "https://media/jane-new"),
        rec("Bob", "Beta", "q2", "https://media/bob"),
    ]);

    SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(*assets.uploads.lock().unwrap(), vec!["https://media/bob".to_string()]);
    let stored = store.testimonials();
    assert_eq!(stored[0].avatar_url, "https://images.example/jane.jpg");
    assert_eq!(stored[1].avatar_url, "https://images.example/bob.jpg");
}

#[tokio::test]
async fn test_avatar_failure_clears_avatar_and_continues() {
    let store = FakeStore::default();
    let assets = FakeAssets {
        failing_labels: HashSet::from(["Bob".to_string()]),
        ..Default::default()
    };
    let source = FakeSource::returning(vec![
        rec("Jane", "Acme", "q1", "https://media/jane"),
        rec("Bob", "Beta", "q2", "https://media/bob"),
    ]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::Synced);
    let stored = store.testimonials();
    assert_eq!(stored[0].avatar_url, "https://images.example/jane.jpg");
    assert_eq!(stored[1].avatar_url, "");

    // Cleared avatars are omitted from the stored JSON
    let section = store.section(TESTIMONIALS_SECTION).unwrap();
    let content = section.fields.localized(CONTENT_FIELD, DEFAULT_LOCALE).unwrap().unwrap();
    assert!(content[1].get("avatarUrl").is_none());
}

#[tokio::test]
async fn test_translation_only_touches_new_entries() {
    let store = FakeStore::default().with_section(TESTIMONIALS_SECTION, 1, stored_jane());
    let assets = FakeAssets::default();
    let translator = FakeTranslator::default();
    let source = FakeSource::returning(vec![
        rec("Jane", "Acme", "q1 again", ""),
        rec("Bob", "Beta", "hola", ""),
    ]);

    SyncWorkflow::new(&store, &assets, &source)
        .with_translator(&translator)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(*translator.calls.lock().unwrap(), vec!["hola".to_string()]);
    let stored = store.testimonials();
    assert_eq!(stored[0].quote, "q1");
    assert_eq!(stored[1].quote, "[en] hola");

    let log = store.build_log();
    assert_eq!(log[0]["translationUsed"], true);
    assert_eq!(log[0]["forceUpdate"], false);
}

#[tokio::test]
async fn test_translation_failure_keeps_original_quote() {
    let store = FakeStore::default();
    let assets = FakeAssets::default();
    let translator = FakeTranslator {
        failing: true,
        ..Default::default()
    };
    let source = FakeSource::returning(vec![rec("Bob", "Beta", "hola", "")]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .with_translator(&translator)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::Synced);
    assert_eq!(store.testimonials()[0].quote, "hola");
}

#[tokio::test]
async fn test_build_log_records_run() {
    let store = FakeStore::default();
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![rec("Jane", "Acme", "q1", "")]);

    SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Replace))
        .await
        .unwrap();

    let log = store.build_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["service"], SERVICE_NAME);
    assert_eq!(log[0]["triggeredBy"], "local");
    assert_eq!(log[0]["forceUpdate"], true);
    assert_eq!(log[0]["newAdded"], 1);
    assert_eq!(log[0]["totalAfterSync"], 1);
    assert_eq!(log[0]["status"], "success");
    assert!(store.published_ids().contains(&"buildLog-entry".to_string()));
}

#[tokio::test]
async fn test_build_log_retention_keeps_other_services() {
    let prior = |service: &str, ts: &str| {
        json!({"service": service, "timestamp": ts, "triggeredBy": "local", "status": "success"})
    };
    let store = FakeStore::default().with_section(
        BUILD_LOG_SECTION,
        9,
        json!({"content": {"en-US": [
            prior(SERVICE_NAME, "2026-01-01T00:00:00Z"),
            prior("portfolio-sync", "2026-01-02T00:00:00Z"),
            prior(SERVICE_NAME, "2026-01-03T00:00:00Z"),
            prior(SERVICE_NAME, "2026-01-04T00:00:00Z"),
        ]}}),
    );
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![rec("Jane", "Acme", "q1", "")]);

    SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    let log = store.build_log();
    let services: Vec<&str> = log.iter().filter_map(|e| e["service"].as_str()).collect();
    assert_eq!(services, vec!["portfolio-sync", SERVICE_NAME, SERVICE_NAME, SERVICE_NAME]);
    assert_eq!(log[1]["timestamp"], "2026-01-03T00:00:00Z");
    assert_eq!(log[2]["timestamp"], "2026-01-04T00:00:00Z");
    assert_eq!(store.section(BUILD_LOG_SECTION).unwrap().version, 10);
}

#[tokio::test]
async fn test_build_log_passes_foreign_records_through() {
    let portfolio = json!({
        "service": "portfolio-sync",
        "timestamp": "2026-01-02T00:00:00Z",
        "status": "success",
        "commit": "abc123",
        "durationMs": 4200
    });
    let deploy = json!({"service": "deploy-bot", "status": "success"});
    let store = FakeStore::default().with_section(
        BUILD_LOG_SECTION,
        9,
        json!({"content": {"en-US": [portfolio.clone(), deploy.clone()]}}),
    );
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![rec("Jane", "Acme", "q1", "")]);

    SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(store.section(BUILD_LOG_SECTION).unwrap().version, 10);
    let log = store.build_log();
    assert_eq!(log.len(), 3);
    assert_eq!(
        serde_json::to_string(&log[0]).unwrap(),
        serde_json::to_string(&portfolio).unwrap()
    );
    assert_eq!(log[1], deploy);
    assert_eq!(log[2]["service"], SERVICE_NAME);
}

#[tokio::test]
async fn test_build_log_failure_is_not_fatal() {
    let store = FakeStore::default().failing(BUILD_LOG_SECTION);
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![rec("Jane", "Acme", "q1", "")]);

    let report = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap();

    assert_eq!(report.outcome, SyncOutcome::Synced);
    assert_eq!(store.testimonials().len(), 1);
}

#[tokio::test]
async fn test_source_failure_aborts_run() {
    let store = FakeStore::default();
    let assets = FakeAssets::default();
    fn expired() -> LinkedInError {
        LinkedInError::SessionExpired("JSESSIONID missing".to_string())
    }
    let source = FakeSource {
        result: Err(expired as fn() -> LinkedInError),
    };

    let err = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Source(_)));
    assert_eq!(err.kind(), Some(FailureKind::Auth));
    assert!(store.section(TESTIMONIALS_SECTION).is_none());
}

#[tokio::test]
async fn test_malformed_content_aborts_without_writing() {
    let store = FakeStore::default().with_section(
        TESTIMONIALS_SECTION,
        3,
        json!({"content": [{"name": "Jane"}]}),
    );
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![rec("Bob", "Beta", "q", "")]);

    let err = SyncWorkflow::new(&store, &assets, &source)
        .run(&options(SyncMode::Merge))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(FailureKind::Decode));
    assert!(store.published_ids().is_empty());
    assert_eq!(store.section(TESTIMONIALS_SECTION).unwrap().version, 3);
}

#[tokio::test]
async fn test_blank_profile_is_config_error() {
    let store = FakeStore::default();
    let assets = FakeAssets::default();
    let source = FakeSource::returning(vec![rec("Jane", "Acme", "q1", "")]);

    let err = SyncWorkflow::new(&store, &assets, &source)
        .run(&SyncOptions {
            profile: "  ".to_string(),
            ..options(SyncMode::Merge)
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Config(_)));
    assert_eq!(err.kind(), None);
}
