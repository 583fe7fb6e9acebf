//! # tsync Common Library
//!
//! Shared code for the tsync workspace:
//! - Record model (scraped recommendations, stored testimonials)
//! - Identity key derivation
//! - Merge/replace reconciliation engine
//! - Ordered entry field documents
//! - Build-log retention
//! - Configuration loading

pub mod build_log;
pub mod config;
pub mod document;
pub mod error;
pub mod identity;
pub mod merge;
pub mod record;

pub use error::{Error, Result};
pub use identity::{identity_key, Identity};
pub use merge::{merge, reconcile, replace, MergeOutcome, SyncMode};
pub use record::{Recommendation, Testimonial};
