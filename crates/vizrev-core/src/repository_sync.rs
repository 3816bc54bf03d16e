//! Promote repositories that own at least one verified release.
//!
//! The sync is one-directional: a repository is never demoted here, even
//! when its last verified release is later unverified or deleted.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};
use vizrev_state::{ReleaseStore, RepositoryId, RepositoryStore};

use crate::domain::{Result, ReviewError};
use crate::obs;

/// Counts from one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Verified releases seen.
    pub verified_releases: usize,
    /// Distinct repositories referenced by those releases.
    pub candidate_repositories: usize,
    /// Repositories flipped from unverified to verified by this pass.
    pub promoted: u64,
}

#[derive(Clone)]
pub struct RepositorySync {
    releases: Arc<dyn ReleaseStore>,
    repositories: Arc<dyn RepositoryStore>,
}

impl RepositorySync {
    pub fn new(releases: Arc<dyn ReleaseStore>, repositories: Arc<dyn RepositoryStore>) -> Self {
        Self {
            releases,
            repositories,
        }
    }

    /// Mark every repository referenced by a verified release as verified.
    ///
    /// Returns [`ReviewError::NoVerifiedReleases`] when no release is
    /// verified. Referenced repositories that do not exist are skipped.
    #[instrument(skip(self))]
    pub async fn verify_repositories_from_releases(&self) -> Result<SyncReport> {
        let ids = self.releases.verified_repository_ids().await?;
        if ids.is_empty() {
            return Err(ReviewError::NoVerifiedReleases);
        }

        let verified_releases = ids.len();
        let candidates: Vec<RepositoryId> = ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        debug!(candidates = candidates.len(), "Promoting repositories");

        let promoted = self.repositories.mark_verified(&candidates).await?;
        obs::emit_repositories_synced(verified_releases, candidates.len(), promoted);

        Ok(SyncReport {
            verified_releases,
            candidate_repositories: candidates.len(),
            promoted,
        })
    }
}

impl std::fmt::Debug for RepositorySync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositorySync").finish_non_exhaustive()
    }
}
