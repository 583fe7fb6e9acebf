//! Gemini translation client
//!
//! One `generateContent` call per text, with a fixed system instruction
//! asking for a bare English translation.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::error::FailureKind;
use crate::types::Translator;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const SYSTEM_INSTRUCTION: &str =
    "Translate the following text to English. Return only the translated text, nothing else.";
const USER_AGENT: &str = concat!("tsync/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Gemini client errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    RequestTimeout(String),

    #[error("API key rejected ({0})")]
    Unauthorized(u16),

    #[error("Gemini API returned {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl GeminiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NetworkError(_) | Self::ApiError(..) => FailureKind::Fetch,
            Self::RequestTimeout(_) => FailureKind::Timeout,
            Self::Unauthorized(_) => FailureKind::Auth,
            Self::ParseError(_) => FailureKind::Decode,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, trimmed and non-empty
    fn into_text(self) -> Result<String, GeminiError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GeminiError::ParseError("response has no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(GeminiError::ParseError("response has no text".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeminiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeminiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait::async_trait]
impl Translator for GeminiClient {
    async fn translate(&self, text: &str) -> Result<String, GeminiError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": [{ "text": text }] }]
        });

        let response = self
            .http_client
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeminiError::RequestTimeout(e.to_string())
                } else {
                    GeminiError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GeminiError::Unauthorized(status.as_u16()));
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(GeminiError::ApiError(status.as_u16(), body));
            }
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::ParseError(e.to_string()))?;

        let translated = result.into_text()?;
        tracing::debug!(model = %self.model, chars = translated.chars().count(), "Translated text");
        Ok(translated)
    }
}
