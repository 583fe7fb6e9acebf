//! Error types for tsync
//!
//! Each collaborator client has its own error enum; every variant maps onto a
//! [`FailureKind`] so the orchestrator can log and decide uniformly.

use thiserror::Error;

use crate::services::contentful_client::ContentfulError;
use crate::services::linkedin_client::LinkedInError;

/// Coarse failure category shared by all collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport failure or unexpected status
    Fetch,
    /// Credentials rejected or session expired
    Auth,
    /// Response did not have the expected shape
    Decode,
    /// Gave up waiting
    Timeout,
    /// Stale version token on write
    Conflict,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fetch => "fetch",
            Self::Auth => "auth",
            Self::Decode => "decode",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// Errors that abort a sync or list run
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Content store failure
    #[error("Content store: {0}")]
    Store(#[from] ContentfulError),

    /// Data source failure
    #[error("Data source: {0}")]
    Source(#[from] LinkedInError),

    /// The whole run exceeded its time limit
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// tsync-common error
    #[error("Common error: {0}")]
    Common(#[from] tsync_common::Error),
}

impl SyncError {
    /// Failure category, `None` for configuration problems
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Config(_) | Self::Common(_) => None,
            Self::Store(e) => Some(e.kind()),
            Self::Source(e) => Some(e.kind()),
            Self::Timeout(_) => Some(FailureKind::Timeout),
        }
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
