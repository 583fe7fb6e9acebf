//! Run orchestration
//!
//! - `sync`: scrape, reconcile, enrich, persist, publish
//! - `build_log`: audit record appended after a successful sync
//! - `list`: read-only rendering of the stored testimonials

pub mod build_log;
pub mod list;
pub mod sync;

pub use build_log::{record_build_log, SERVICE_NAME};
pub use list::{fetch_testimonials, format_testimonials};
pub use sync::{SyncOptions, SyncOutcome, SyncReport, SyncWorkflow};
