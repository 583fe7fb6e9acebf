//! LinkedIn Voyager API client
//!
//! Fetches the recommendations received by the session owner's profile.
//! Authentication rides on the browser session cookie (`li_at`); Voyager
//! additionally wants the `JSESSIONID` cookie echoed back as a CSRF token,
//! which is obtained by loading the home page once with a cookie jar.
//!
//! Per-recommender lookups (profile, company) are best effort: a failure is
//! logged and the recommendation is kept with whatever fields did resolve,
//! then dropped by the validity check if its name never arrived.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::COOKIE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tsync_common::Recommendation;

use crate::error::FailureKind;
use crate::types::RecommendationSource;

pub const LINKEDIN_HOME_URL: &str = "https://www.linkedin.com/";
pub const VOYAGER_BASE_URL: &str = "https://www.linkedin.com/voyager/api";
const PROFILE_URL_PREFIX: &str = "https://www.linkedin.com/in/";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36";
const PROFILE_DECORATION: &str =
    "com.linkedin.voyager.dash.deco.identity.profile.TopCardSupplementary-166";
const SESSION_COOKIE: &str = "li_at";
const CSRF_COOKIE: &str = "JSESSIONID";
const RATE_LIMIT_MS: u64 = 250;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const PREFERRED_AVATAR_WIDTH: u32 = 200;

/// LinkedIn client errors
#[derive(Debug, Error)]
pub enum LinkedInError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    RequestTimeout(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Voyager API returned {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LinkedInError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NetworkError(_) | Self::ApiError(..) => FailureKind::Fetch,
            Self::RequestTimeout(_) => FailureKind::Timeout,
            Self::SessionExpired(_) => FailureKind::Auth,
            Self::ParseError(_) => FailureKind::Decode,
        }
    }
}

fn transport_error(e: reqwest::Error) -> LinkedInError {
    if e.is_timeout() {
        LinkedInError::RequestTimeout(e.to_string())
    } else {
        LinkedInError::NetworkError(e.to_string())
    }
}

// --- Voyager response shapes ---

#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(rename = "miniProfile")]
    mini_profile: Option<MiniProfile>,
}

#[derive(Debug, Deserialize)]
struct MiniProfile {
    #[serde(rename = "dashEntityUrn", default)]
    dash_entity_urn: String,
    #[serde(rename = "publicIdentifier", default)]
    public_identifier: String,
}

#[derive(Debug, Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    elements: Vec<VoyagerRecommendation>,
}

#[derive(Debug, Deserialize)]
struct VoyagerRecommendation {
    #[serde(rename = "recommendationText", default)]
    text: String,
    #[serde(rename = "recommenderProfileUrn", default)]
    recommender_urn: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashProfile {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    public_identifier: String,
    profile_picture: Option<ProfilePicture>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePicture {
    display_image: Option<DisplayImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplayImage {
    vector_image: Option<VectorImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VectorImage {
    #[serde(rename = "rootUrl", default)]
    root_url: String,
    #[serde(default)]
    artifacts: Vec<ImageArtifact>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageArtifact {
    #[serde(default)]
    width: u32,
    #[serde(rename = "fileIdentifyingUrlPathSegment", default)]
    path_segment: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecoratedProfile {
    profile_top_position: Option<TopPositions>,
}

#[derive(Debug, Deserialize)]
struct TopPositions {
    #[serde(default)]
    elements: Vec<TopPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopPosition {
    #[serde(default)]
    company_name: String,
}

impl DashProfile {
    fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    fn profile_url(&self) -> String {
        if self.public_identifier.is_empty() {
            String::new()
        } else {
            format!("{}{}", PROFILE_URL_PREFIX, self.public_identifier)
        }
    }

    /// Avatar URL: the 200px artifact if present, else the first one
    fn avatar_url(&self) -> String {
        let Some(image) = self
            .profile_picture
            .as_ref()
            .and_then(|p| p.display_image.as_ref())
            .and_then(|d| d.vector_image.as_ref())
        else {
            return String::new();
        };

        if image.root_url.is_empty() {
            return String::new();
        }

        let chosen = image
            .artifacts
            .iter()
            .find(|a| a.width == PREFERRED_AVATAR_WIDTH)
            .or_else(|| image.artifacts.first());

        match chosen {
            Some(artifact) if !artifact.path_segment.is_empty() => {
                format!("{}{}", image.root_url, artifact.path_segment)
            }
            _ => String::new(),
        }
    }
}

/// Value of one cookie from a `Cookie` header, surrounding quotes stripped
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.trim_matches('"').to_string())
    })
}

/// One Voyager request per `RATE_LIMIT_MS`, no burst
fn voyager_quota() -> Quota {
    Quota::with_period(Duration::from_millis(RATE_LIMIT_MS))
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
}

/// LinkedIn Voyager API client
pub struct LinkedInClient {
    http_client: reqwest::Client,
    session_cookie: String,
    home_url: String,
    voyager_base: String,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

/// Authenticated Voyager session
struct VoyagerSession {
    csrf_token: String,
}

impl LinkedInClient {
    pub fn new(session_cookie: impl Into<String>) -> Result<Self, LinkedInError> {
        let http_client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LinkedInError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            session_cookie: session_cookie.into(),
            home_url: LINKEDIN_HOME_URL.to_string(),
            voyager_base: VOYAGER_BASE_URL.to_string(),
            rate_limiter: RateLimiter::direct(voyager_quota()),
        })
    }

    /// Point the client at other hosts (local fakes in tests)
    pub fn with_base_urls(mut self, home_url: impl Into<String>, voyager_base: impl Into<String>) -> Self {
        self.home_url = home_url.into();
        self.voyager_base = voyager_base.into().trim_end_matches('/').to_string();
        self
    }

    fn voyager_url(&self, path: &str) -> Result<Url, LinkedInError> {
        Url::parse(&format!("{}/{}", self.voyager_base, path))
            .map_err(|e| LinkedInError::ParseError(format!("voyager url: {}", e)))
    }

    /// Load the home page with the session cookie to obtain `JSESSIONID`
    async fn open_session(&self) -> Result<VoyagerSession, LinkedInError> {
        let home = Url::parse(&self.home_url)
            .map_err(|e| LinkedInError::ParseError(format!("home url: {}", e)))?;

        let jar = Arc::new(Jar::default());
        jar.add_cookie_str(&format!("{}={}", SESSION_COOKIE, self.session_cookie), &home);

        let jar_client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_provider(jar.clone())
            .build()
            .map_err(|e| LinkedInError::NetworkError(e.to_string()))?;

        // Body is irrelevant; redirects along the way may set the cookie
        let response = jar_client.get(home.clone()).send().await.map_err(transport_error)?;
        if let Err(e) = response.bytes().await {
            tracing::debug!(error = %e, "Failed to read home page body");
        }

        let csrf_token = jar
            .cookies(&home)
            .and_then(|header| header.to_str().ok().and_then(|h| cookie_value(h, CSRF_COOKIE)))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                LinkedInError::SessionExpired(format!(
                    "{} cookie not found, {} cookie may be expired",
                    CSRF_COOKIE, SESSION_COOKIE
                ))
            })?;

        tracing::debug!("Obtained Voyager CSRF token");
        Ok(VoyagerSession { csrf_token })
    }

    async fn voyager_get(&self, session: &VoyagerSession, url: Url) -> Result<reqwest::Response, LinkedInError> {
        self.rate_limiter.until_ready().await;
        tracing::debug!(url = %url, "Querying Voyager API");

        let response = self
            .http_client
            .get(url)
            .header("csrf-token", &session.csrf_token)
            .header("x-restli-protocol-version", "2.0.0")
            .header(
                COOKIE,
                format!(
                    "{}={}; {}={}",
                    SESSION_COOKIE, self.session_cookie, CSRF_COOKIE, session.csrf_token
                ),
            )
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LinkedInError::SessionExpired(format!("Voyager returned {}", status.as_u16()))
            }
            _ => LinkedInError::ApiError(status.as_u16(), body),
        })
    }

    async fn voyager_json<T: serde::de::DeserializeOwned>(
        &self,
        session: &VoyagerSession,
        url: Url,
        what: &str,
    ) -> Result<T, LinkedInError> {
        self.voyager_get(session, url)
            .await?
            .json()
            .await
            .map_err(|e| LinkedInError::ParseError(format!("decode {}: {}", what, e)))
    }

    /// Resolve the session owner's profile URN via `/me`
    async fn fetch_profile_urn(&self, session: &VoyagerSession, profile: &str) -> Result<String, LinkedInError> {
        let me: MeResponse = self.voyager_json(session, self.voyager_url("me")?, "/me").await?;

        let mini = me
            .mini_profile
            .filter(|m| !m.dash_entity_urn.is_empty())
            .ok_or_else(|| LinkedInError::ParseError("dashEntityUrn not found in /me response".to_string()))?;

        if !mini.public_identifier.is_empty() && !mini.public_identifier.eq_ignore_ascii_case(profile) {
            tracing::warn!(
                requested = %profile,
                session_owner = %mini.public_identifier,
                "Session belongs to a different profile; fetching the session owner's recommendations"
            );
        }

        tracing::info!(urn = %mini.dash_entity_urn, "Resolved profile URN");
        Ok(mini.dash_entity_urn)
    }

    fn profile_url_for(&self, urn: &str) -> Result<Url, LinkedInError> {
        let mut url = self.voyager_url("identity/dash/profiles")?;
        url.path_segments_mut()
            .map_err(|_| LinkedInError::ParseError("voyager url cannot have segments".to_string()))?
            .push(urn);
        Ok(url)
    }

    async fn fetch_profile(&self, session: &VoyagerSession, urn: &str) -> Result<DashProfile, LinkedInError> {
        let url = self.profile_url_for(urn)?;
        self.voyager_json(session, url, "profile").await
    }

    async fn fetch_company(&self, session: &VoyagerSession, urn: &str) -> Result<String, LinkedInError> {
        let mut url = self.profile_url_for(urn)?;
        url.query_pairs_mut().append_pair("decorationId", PROFILE_DECORATION);

        let decorated: DecoratedProfile = self.voyager_json(session, url, "decorated profile").await?;

        Ok(decorated
            .profile_top_position
            .and_then(|p| p.elements.into_iter().next())
            .map(|p| p.company_name)
            .unwrap_or_default())
    }

    async fn fetch_received(&self, session: &VoyagerSession, urn: &str) -> Result<Vec<VoyagerRecommendation>, LinkedInError> {
        let mut url = self.voyager_url("identity/dash/recommendations")?;
        url.query_pairs_mut()
            .append_pair("q", "received")
            .append_pair("profileUrn", urn);
        // Rest.li list syntax must keep its parentheses unescaped
        let query = format!("{}&recommendationStatuses=List(VISIBLE)", url.query().unwrap_or_default());
        url.set_query(Some(&query));

        let result: RecommendationsResponse = self.voyager_json(session, url, "recommendations").await?;
        Ok(result.elements)
    }

    /// Build one recommendation, enriching it from the recommender's profile
    async fn enrich(&self, session: &VoyagerSession, element: VoyagerRecommendation) -> Recommendation {
        let mut rec = Recommendation {
            quote: element.text,
            ..Default::default()
        };

        if element.recommender_urn.is_empty() {
            return rec;
        }

        match self.fetch_profile(session, &element.recommender_urn).await {
            Ok(profile) => {
                rec.name = profile.display_name();
                rec.role = profile.headline.clone();
                rec.profile_url = profile.profile_url();
                rec.avatar_url = profile.avatar_url();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch profile for recommender");
            }
        }

        match self.fetch_company(session, &element.recommender_urn).await {
            Ok(company) => rec.company = company,
            Err(e) => {
                tracing::warn!(name = %rec.name, error = %e, "Could not fetch company for recommender");
            }
        }

        rec
    }
}

#[async_trait::async_trait]
impl RecommendationSource for LinkedInClient {
    async fn fetch_recommendations(&self, profile: &str) -> Result<Vec<Recommendation>, LinkedInError> {
        let session = self.open_session().await?;
        let urn = self.fetch_profile_urn(&session, profile).await?;
        let elements = self.fetch_received(&session, &urn).await?;

        tracing::debug!(count = elements.len(), "Fetched recommendation elements");

        let mut recs = Vec::with_capacity(elements.len());
        for element in elements {
            if element.text.is_empty() {
                continue;
            }

            let rec = self.enrich(&session, element).await;
            if rec.is_valid() {
                recs.push(rec);
            } else {
                tracing::debug!("Dropping recommendation without name or quote");
            }
        }

        Ok(recs)
    }
}
