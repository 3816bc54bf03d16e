//! vizrev core library
//!
//! Release verification workflow: reviewer entries, majority evaluation,
//! and promotion of repositories that own verified releases.

pub mod domain;
pub mod evaluator;
pub mod obs;
pub mod repository_sync;
pub mod review;
pub mod telemetry;

pub use domain::{validate_patch, NewRelease, NewStatus, Result, ReviewError, StatusPatch};
pub use evaluator::{evaluate, is_strict_majority, Tally, Verdict};
pub use repository_sync::{RepositorySync, SyncReport};
pub use review::{ReleaseReview, StatusUpdate};
pub use telemetry::{init_tracing, level_for};

pub use vizrev_state::{
    ReleaseId, ReleasePatch, ReleaseRecord, ReleaseStore, RepositoryId, RepositoryRecord,
    RepositoryStore, StatusId, VerificationEntry,
};

/// Crate version, reported by the daemon's health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
