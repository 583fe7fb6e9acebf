//! Collaborator traits and shared types
//!
//! The orchestrator talks to four external services through these traits:
//! - [`ContentStore`]: versioned entries holding site sections
//! - [`AssetStore`]: permanent hosting for avatar images
//! - [`RecommendationSource`]: scraped recommendations for a profile
//! - [`Translator`]: free-text translation
//!
//! Production implementations live in `services`; tests substitute
//! in-memory fakes.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tsync_common::document::{EntryFields, DEFAULT_LOCALE};
use tsync_common::Recommendation;

use crate::services::contentful_client::ContentfulError;
use crate::services::gemini_client::GeminiError;
use crate::services::linkedin_client::LinkedInError;

/// Section id of the testimonials entry
pub const TESTIMONIALS_SECTION: &str = "testimonials";
/// Title given to a newly created testimonials entry
pub const TESTIMONIALS_TITLE: &str = "Testimonials";
/// Section id of the shared build-log entry
pub const BUILD_LOG_SECTION: &str = "buildLog";
/// Title given to a newly created build-log entry
pub const BUILD_LOG_TITLE: &str = "Build Log";
/// Entry field holding a section's payload
pub const CONTENT_FIELD: &str = "content";

/// A section entry as read from the store
///
/// `entry_id == None` means the entry does not exist yet and must be
/// created rather than updated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionEntry {
    pub entry_id: Option<String>,
    /// Version token to echo back on update
    pub version: u64,
    /// Every field of the entry, in stored order
    pub fields: EntryFields,
}

impl SectionEntry {
    pub fn exists(&self) -> bool {
        self.entry_id.is_some()
    }

    /// Decode the `content` array
    ///
    /// A missing `content` field reads as an empty collection; a field that
    /// is present but malformed is a decode error.
    pub fn decode_content<T: DeserializeOwned>(&self) -> Result<Vec<T>, ContentfulError> {
        self.fields
            .localized_as::<Vec<T>>(CONTENT_FIELD, DEFAULT_LOCALE)
            .map(Option::unwrap_or_default)
            .map_err(|e| ContentfulError::ParseError(format!("content field: {}", e)))
    }
}

/// Stored entry reference after a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRef {
    pub id: String,
    pub version: u64,
}

/// Versioned content store holding section entries
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the entry for a section, or an empty non-existent entry
    async fn fetch_section(&self, section_id: &str) -> Result<SectionEntry, ContentfulError>;

    /// Create a new section entry with the given content
    async fn create_section(
        &self,
        section_id: &str,
        title: &str,
        content: Value,
    ) -> Result<EntryRef, ContentfulError>;

    /// Replace the `content` field of an existing entry, keeping every other field
    ///
    /// The entry's version is sent as the optimistic-concurrency token.
    async fn update_section(
        &self,
        entry: &SectionEntry,
        content: Value,
    ) -> Result<EntryRef, ContentfulError>;

    /// Publish an entry at the given version
    async fn publish(&self, entry: &EntryRef) -> Result<(), ContentfulError>;
}

/// Permanent hosting for images referenced by URL
#[async_trait::async_trait]
pub trait AssetStore: Send + Sync {
    /// Copy the image at `image_url` into the store and return its permanent URL
    async fn upload_by_url(&self, image_url: &str, label: &str) -> Result<String, ContentfulError>;
}

/// Source of scraped recommendations
#[async_trait::async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Fetch valid recommendations received by `profile`
    async fn fetch_recommendations(
        &self,
        profile: &str,
    ) -> Result<Vec<Recommendation>, LinkedInError>;
}

/// Free-text translator
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, GeminiError>;
}
