//! HTTP clients for the external collaborators
//!
//! - Contentful: section entries (`contentful_client`) and avatar assets
//!   (`contentful_assets`)
//! - LinkedIn Voyager: received recommendations
//! - Gemini: translation

pub mod contentful_assets;
pub mod contentful_client;
pub mod gemini_client;
pub mod linkedin_client;

pub use contentful_client::{ContentfulClient, ContentfulError};
pub use gemini_client::{GeminiClient, GeminiError};
pub use linkedin_client::{LinkedInClient, LinkedInError};
