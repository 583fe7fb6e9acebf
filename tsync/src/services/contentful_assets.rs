//! Avatar upload into Contentful assets
//!
//! **Algorithm:**
//! 1. Download the image (content type defaults to `image/jpeg`)
//! 2. POST the raw bytes to the upload API
//! 3. Create an asset linked to the upload
//! 4. Ask Contentful to process the asset file
//! 5. Poll the asset until processing exposes a file URL
//! 6. Publish the asset at the polled version and return its CDN URL

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tsync_common::document::DEFAULT_LOCALE;

use super::contentful_client::{
    decode, expect_status, transport_error, ContentfulClient, ContentfulError, EntryItem,
    VERSION_HEADER,
};
use crate::types::AssetStore;
use crate::utils::poll_until;

const ASSET_POLL_ATTEMPTS: u32 = 20;
const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    sys: UploadSys,
}

#[derive(Debug, Deserialize)]
struct UploadSys {
    id: String,
}

/// File-safe slug of a display name
///
/// Lowercase, spaces become hyphens, anything outside `[a-z0-9-]` dropped.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// File extension for an image content type
pub fn extension_for(content_type: &str) -> &'static str {
    if content_type.contains("png") {
        ".png"
    } else if content_type.contains("webp") {
        ".webp"
    } else if content_type.contains("gif") {
        ".gif"
    } else {
        ".jpg"
    }
}

/// Absolute URL for a processed asset file (`//images.ctfassets.net/...`)
fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    }
}

impl ContentfulClient {
    async fn download_image(&self, image_url: &str) -> Result<(Vec<u8>, String), ContentfulError> {
        let response = self
            .http_client
            .get(image_url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ContentfulError::ApiError(
                status.as_u16(),
                "download image failed".to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_IMAGE_TYPE)
            .to_string();

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok((bytes.to_vec(), content_type))
    }

    async fn upload_binary(&self, data: Vec<u8>) -> Result<String, ContentfulError> {
        let url = format!("{}/spaces/{}/uploads", self.upload_base, self.space_id);

        let response = self
            .authorized(self.http_client.post(url))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(transport_error)?;

        let response = expect_status(response, StatusCode::CREATED, "upload").await?;
        let upload: UploadResponse = decode(response, "upload response").await?;
        Ok(upload.sys.id)
    }

    async fn create_asset(
        &self,
        upload_id: &str,
        label: &str,
        content_type: &str,
    ) -> Result<EntryItem, ContentfulError> {
        let file_name = format!("{}{}", slugify(label), extension_for(content_type));
        let body = json!({
            "fields": {
                "title": { DEFAULT_LOCALE: format!("{} avatar", label) },
                "file": {
                    DEFAULT_LOCALE: {
                        "contentType": content_type,
                        "fileName": file_name,
                        "uploadFrom": {
                            "sys": { "type": "Link", "linkType": "Upload", "id": upload_id }
                        }
                    }
                }
            }
        });

        let request = self.authorized(self.http_client.post(self.env_url("assets")));
        let response = Self::with_cma_json(request, &body)?
            .send()
            .await
            .map_err(transport_error)?;

        let response = expect_status(response, StatusCode::CREATED, "create asset").await?;
        decode(response, "asset response").await
    }

    async fn process_asset(&self, asset_id: &str, version: u64) -> Result<(), ContentfulError> {
        let url = self.env_url(&format!("assets/{}/files/{}/process", asset_id, DEFAULT_LOCALE));

        let response = self
            .authorized(self.http_client.put(url))
            .header(VERSION_HEADER, version.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        expect_status(response, StatusCode::NO_CONTENT, "process asset").await?;
        Ok(())
    }

    /// One look at the asset: `Some((url, version))` once processed
    async fn processed_file(&self, asset_id: &str) -> Option<(String, u64)> {
        let response = self
            .authorized(self.http_client.get(self.env_url(&format!("assets/{}", asset_id))))
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let asset: EntryItem = response.json().await.ok()?;
        let file = asset.fields.localized("file", DEFAULT_LOCALE).ok()??;
        let url = file.get("url")?.as_str().filter(|u| !u.is_empty())?;

        Some((url.to_string(), asset.sys.version))
    }

    async fn publish_asset(&self, asset_id: &str, version: u64) -> Result<(), ContentfulError> {
        let url = self.env_url(&format!("assets/{}/published", asset_id));

        let response = self
            .authorized(self.http_client.put(url))
            .header(VERSION_HEADER, version.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        expect_status(response, StatusCode::OK, "CMA asset publish").await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AssetStore for ContentfulClient {
    async fn upload_by_url(&self, image_url: &str, label: &str) -> Result<String, ContentfulError> {
        let (data, content_type) = self.download_image(image_url).await?;
        tracing::debug!(label = %label, bytes = data.len(), content_type = %content_type, "Downloaded image");

        let upload_id = self.upload_binary(data).await?;
        let asset = self.create_asset(&upload_id, label, &content_type).await?;
        let asset_id = asset.sys.id;

        self.process_asset(&asset_id, asset.sys.version).await?;

        let (url, version) = poll_until("asset processing", ASSET_POLL_ATTEMPTS, self.poll_interval, || {
            self.processed_file(&asset_id)
        })
        .await
        .ok_or_else(|| ContentfulError::ProcessingTimeout(label.to_string()))?;

        self.publish_asset(&asset_id, version).await?;

        let cdn_url = absolute_url(&url);
        tracing::info!(label = %label, asset_id = %asset_id, url = %cdn_url, "Avatar uploaded");
        Ok(cdn_url)
    }
}
