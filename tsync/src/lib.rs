//! tsync library interface
//!
//! Exposes the workflow, collaborator traits and clients for integration
//! testing.

pub mod cli;
pub mod config;
pub mod error;
pub mod services;
pub mod types;
pub mod utils;
pub mod workflow;

pub use crate::error::{FailureKind, SyncError, SyncResult};
