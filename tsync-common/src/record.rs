//! Record model shared between the data source and the content store
//!
//! A [`Recommendation`] is what a scrape produces; a [`Testimonial`] is what
//! the content store persists inside the testimonials section. Both carry the
//! same identity fields (`name`, `company`).

use serde::{Deserialize, Serialize};

/// A single recommendation as scraped from a profile page
///
/// Empty strings mean "absent" for every optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Recommender display name (required)
    pub name: String,
    /// Recommender headline / role
    #[serde(default)]
    pub role: String,
    /// Recommender company (part of identity)
    #[serde(default)]
    pub company: String,
    /// Recommendation body (required)
    pub quote: String,
    /// Hotlinked avatar image, replaced by a permanent asset URL on upload
    #[serde(default)]
    pub avatar_url: String,
    /// Permanent link back to the recommender's profile
    #[serde(default)]
    pub profile_url: String,
}

impl Recommendation {
    /// Create a recommendation with just the required fields and company
    pub fn new(
        name: impl Into<String>,
        company: impl Into<String>,
        quote: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            company: company.into(),
            quote: quote.into(),
            ..Default::default()
        }
    }

    /// Validity check applied by the data source and the merge engine
    ///
    /// A record needs a non-blank name and a non-blank quote.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.quote.trim().is_empty()
    }
}

/// A testimonial as stored in the content store's `content` field
///
/// Field names match the JSON array the site reads, so `avatarUrl` and
/// `linkedInUrl` are omitted rather than written empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testimonial {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub quote: String,
    #[serde(rename = "avatarUrl", default, skip_serializing_if = "String::is_empty")]
    pub avatar_url: String,
    #[serde(rename = "linkedInUrl", default, skip_serializing_if = "String::is_empty")]
    pub profile_url: String,
}

impl From<Recommendation> for Testimonial {
    fn from(rec: Recommendation) -> Self {
        Self {
            name: rec.name,
            role: rec.role,
            company: rec.company,
            quote: rec.quote,
            avatar_url: rec.avatar_url,
            profile_url: rec.profile_url,
        }
    }
}

impl From<&Recommendation> for Testimonial {
    fn from(rec: &Recommendation) -> Self {
        rec.clone().into()
    }
}
