//! Contentful Management API client
//!
//! Reads and writes `siteSection` entries. Each section is one entry whose
//! `content` field holds a JSON array; updates follow fetch-mutate-put with
//! the entry version echoed in `X-Contentful-Version`, so a concurrent
//! writer makes our update fail with 409 instead of being overwritten.
//!
//! Asset upload lives in `contentful_assets`.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tsync_common::document::{EntryFields, DEFAULT_LOCALE};

use crate::error::FailureKind;
use crate::types::{ContentStore, EntryRef, SectionEntry, CONTENT_FIELD};

pub const CMA_BASE_URL: &str = "https://api.contentful.com";
pub const UPLOAD_BASE_URL: &str = "https://upload.contentful.com";
pub const DEFAULT_ENVIRONMENT: &str = "master";

pub(crate) const CMA_CONTENT_TYPE: &str = "application/vnd.contentful.management.v1+json";
pub(crate) const VERSION_HEADER: &str = "X-Contentful-Version";
const CONTENT_TYPE_HEADER: &str = "X-Contentful-Content-Type";
const SECTION_CONTENT_TYPE: &str = "siteSection";
const USER_AGENT: &str = concat!("tsync/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const ASSET_POLL_INTERVAL_MS: u64 = 500;

/// Contentful client errors
#[derive(Debug, Error)]
pub enum ContentfulError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    RequestTimeout(String),

    #[error("Unauthorized ({0}): {1}")]
    Unauthorized(u16, String),

    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Entry does not exist: {0}")]
    MissingEntry(String),

    #[error("Asset processing timed out for {0}")]
    ProcessingTimeout(String),
}

impl ContentfulError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NetworkError(_) | Self::ApiError(..) | Self::MissingEntry(_) => FailureKind::Fetch,
            Self::RequestTimeout(_) | Self::ProcessingTimeout(_) => FailureKind::Timeout,
            Self::Unauthorized(..) => FailureKind::Auth,
            Self::VersionConflict(_) => FailureKind::Conflict,
            Self::ParseError(_) => FailureKind::Decode,
        }
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> ContentfulError {
    if e.is_timeout() {
        ContentfulError::RequestTimeout(e.to_string())
    } else {
        ContentfulError::NetworkError(e.to_string())
    }
}

/// Return the response when it has the expected status, else classify the failure
pub(crate) async fn expect_status(
    response: reqwest::Response,
    expected: StatusCode,
    operation: &str,
) -> Result<reqwest::Response, ContentfulError> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ContentfulError::Unauthorized(status.as_u16(), body)
        }
        StatusCode::CONFLICT => ContentfulError::VersionConflict(format!("{}: {}", operation, body)),
        _ => ContentfulError::ApiError(status.as_u16(), format!("{} failed: {}", operation, body)),
    })
}

pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, ContentfulError> {
    response
        .json()
        .await
        .map_err(|e| ContentfulError::ParseError(format!("decode {}: {}", what, e)))
}

/// Query response for `GET /entries`
#[derive(Debug, Deserialize)]
struct EntriesResponse {
    #[serde(default)]
    items: Vec<EntryItem>,
}

/// Entry or asset as returned by the CMA
#[derive(Debug, Deserialize)]
pub(crate) struct EntryItem {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: EntryFields,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntrySys {
    pub id: String,
    #[serde(default)]
    pub version: u64,
}

impl From<EntryItem> for EntryRef {
    fn from(item: EntryItem) -> Self {
        Self {
            id: item.sys.id,
            version: item.sys.version,
        }
    }
}

/// Contentful Management API client
pub struct ContentfulClient {
    pub(crate) http_client: reqwest::Client,
    pub(crate) space_id: String,
    token: String,
    environment: String,
    cma_base: String,
    pub(crate) upload_base: String,
    pub(crate) poll_interval: Duration,
}

impl ContentfulClient {
    pub fn new(space_id: impl Into<String>, token: impl Into<String>) -> Result<Self, ContentfulError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ContentfulError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            space_id: space_id.into(),
            token: token.into(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            cma_base: CMA_BASE_URL.to_string(),
            upload_base: UPLOAD_BASE_URL.to_string(),
            poll_interval: Duration::from_millis(ASSET_POLL_INTERVAL_MS),
        })
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Point the client at other API hosts (local fakes in tests)
    pub fn with_base_urls(mut self, cma_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        self.cma_base = cma_base.into().trim_end_matches('/').to_string();
        self.upload_base = upload_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// `{cma}/spaces/{space}/environments/{env}/{path}`
    pub(crate) fn env_url(&self, path: &str) -> String {
        format!(
            "{}/spaces/{}/environments/{}/{}",
            self.cma_base, self.space_id, self.environment, path
        )
    }

    pub(crate) fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.token)
    }

    /// Send a CMA JSON body
    pub(crate) fn with_cma_json(
        request: reqwest::RequestBuilder,
        body: &Value,
    ) -> Result<reqwest::RequestBuilder, ContentfulError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ContentfulError::ParseError(format!("encode body: {}", e)))?;
        Ok(request.header(CONTENT_TYPE, CMA_CONTENT_TYPE).body(bytes))
    }
}

#[async_trait::async_trait]
impl ContentStore for ContentfulClient {
    async fn fetch_section(&self, section_id: &str) -> Result<SectionEntry, ContentfulError> {
        tracing::debug!(section = %section_id, "Querying Contentful section entry");

        let response = self
            .authorized(self.http_client.get(self.env_url("entries")))
            .query(&[
                ("content_type", SECTION_CONTENT_TYPE),
                ("fields.sectionId", section_id),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let response = expect_status(response, StatusCode::OK, "CMA query").await?;
        let result: EntriesResponse = decode(response, "entries response").await?;

        let Some(item) = result.items.into_iter().next() else {
            tracing::info!(section = %section_id, "Section entry does not exist yet");
            return Ok(SectionEntry::default());
        };

        if !item.fields.contains(CONTENT_FIELD) {
            tracing::warn!(
                section = %section_id,
                entry_id = %item.sys.id,
                "Section entry has no content field, treating as empty"
            );
        }

        Ok(SectionEntry {
            entry_id: Some(item.sys.id),
            version: item.sys.version,
            fields: item.fields,
        })
    }

    async fn create_section(
        &self,
        section_id: &str,
        title: &str,
        content: Value,
    ) -> Result<EntryRef, ContentfulError> {
        let body = json!({
            "fields": {
                "sectionId": { DEFAULT_LOCALE: section_id },
                "title": { DEFAULT_LOCALE: title },
                CONTENT_FIELD: { DEFAULT_LOCALE: content },
            }
        });

        let request = self
            .authorized(self.http_client.post(self.env_url("entries")))
            .header(CONTENT_TYPE_HEADER, SECTION_CONTENT_TYPE);
        let response = Self::with_cma_json(request, &body)?
            .send()
            .await
            .map_err(transport_error)?;

        let response = expect_status(response, StatusCode::CREATED, "CMA create").await?;
        let created: EntryItem = decode(response, "create response").await?;

        tracing::info!(
            section = %section_id,
            entry_id = %created.sys.id,
            version = created.sys.version,
            "Created section entry"
        );

        Ok(created.into())
    }

    async fn update_section(
        &self,
        entry: &SectionEntry,
        content: Value,
    ) -> Result<EntryRef, ContentfulError> {
        let entry_id = entry
            .entry_id
            .as_deref()
            .ok_or_else(|| ContentfulError::MissingEntry("update needs an existing entry".to_string()))?;

        let fields = entry
            .fields
            .with_localized(CONTENT_FIELD, DEFAULT_LOCALE, &content)
            .map_err(|e| ContentfulError::ParseError(e.to_string()))?;
        let body = json!({ "fields": fields });

        let request = self
            .authorized(self.http_client.put(self.env_url(&format!("entries/{}", entry_id))))
            .header(VERSION_HEADER, entry.version.to_string());
        let response = Self::with_cma_json(request, &body)?
            .send()
            .await
            .map_err(transport_error)?;

        let response = expect_status(response, StatusCode::OK, "CMA update").await?;
        let updated: EntryItem = decode(response, "update response").await?;

        tracing::info!(
            entry_id = %entry_id,
            from_version = entry.version,
            to_version = updated.sys.version,
            "Updated section entry"
        );

        Ok(updated.into())
    }

    async fn publish(&self, entry: &EntryRef) -> Result<(), ContentfulError> {
        let response = self
            .authorized(
                self.http_client
                    .put(self.env_url(&format!("entries/{}/published", entry.id))),
            )
            .header(VERSION_HEADER, entry.version.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        expect_status(response, StatusCode::OK, "CMA publish").await?;

        tracing::info!(entry_id = %entry.id, version = entry.version, "Published entry");
        Ok(())
    }
}
