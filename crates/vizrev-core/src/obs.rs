//! Structured observability hooks for the release review lifecycle.
//!
//! Every event carries an `event` field naming the lifecycle step. Events are
//! emitted at `info!` level (configurable via `RUST_LOG`), except write
//! conflicts which are warnings.

use tracing::{info, warn};

use crate::evaluator::{Tally, Verdict};

/// Emit event: verification entry recorded without evaluation.
pub fn emit_status_appended(release_id: &str, reviewer_id: &str, atomic: bool, total: usize) {
    info!(
        event = "status.appended",
        release_id = %release_id,
        reviewer_id = %reviewer_id,
        atomic = atomic,
        total = total,
    );
}

/// Emit event: a verdict was applied to the stored release.
pub fn emit_release_evaluated(release_id: &str, tally: &Tally, verdict: Verdict, attempt: u32) {
    info!(
        event = "release.evaluated",
        release_id = %release_id,
        attempt = attempt,
        total = tally.total,
        approvals = tally.approvals,
        rejections = tally.rejections,
        pending = tally.pending,
        verdict = ?verdict,
    );
}

/// Emit event: release removed after a majority rejection.
pub fn emit_release_rejected(release_id: &str, rejections: usize, total: usize) {
    info!(
        event = "release.rejected",
        release_id = %release_id,
        rejections = rejections,
        total = total,
    );
}

/// Emit event: conditional write lost a race (warning level).
pub fn emit_update_conflict(release_id: &str, attempt: u32, max_attempts: u32) {
    warn!(
        event = "release.update_conflict",
        release_id = %release_id,
        attempt = attempt,
        max_attempts = max_attempts,
    );
}

/// Emit event: repositories promoted from verified releases.
pub fn emit_repositories_synced(verified_releases: usize, candidates: usize, promoted: u64) {
    info!(
        event = "repositories.synced",
        verified_releases = verified_releases,
        candidates = candidates,
        promoted = promoted,
    );
}
