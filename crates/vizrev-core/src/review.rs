//! Release review aggregate.
//!
//! Records reviewer entries on a release and applies the majority verdict.
//! Full-document writes are conditional on the loaded `version`; a lost race
//! reloads and replays the operation, so concurrent reviewers never overwrite
//! each other and a release deleted underneath a request surfaces as
//! `ReleaseNotFound` instead of being written back.

use std::sync::Arc;

use tracing::{debug, instrument};
use vizrev_state::{
    ReleaseId, ReleasePatch, ReleaseRecord, ReleaseStore, RepositoryId, StatusId, StorageError,
};

use crate::domain::{validate_patch, NewRelease, NewStatus, Result, ReviewError, StatusPatch};
use crate::evaluator::{evaluate, Tally};
use crate::obs;

/// Outcome of updating a verification entry.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Entry saved; `verified` recomputed.
    Updated(ReleaseRecord),
    /// A majority rejected the release and it was removed.
    Deleted { release_id: ReleaseId },
}

/// Review operations over a release store.
#[derive(Clone)]
pub struct ReleaseReview {
    store: Arc<dyn ReleaseStore>,
    max_attempts: u32,
}

impl ReleaseReview {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn new(store: Arc<dyn ReleaseStore>) -> Self {
        Self {
            store,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// How many times a conditional write may lose a race before giving up.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    // ========== Release management ==========

    #[instrument(skip(self, new_release), fields(repository_id = %new_release.repository_id))]
    pub async fn create_release(&self, new_release: NewRelease) -> Result<ReleaseRecord> {
        let record = new_release.into_record()?;
        debug!(release_id = %record.id, statuses = record.statuses.len(), "Creating release");
        Ok(self.store.insert_release(record).await?)
    }

    pub async fn get_release(&self, release_id: &ReleaseId) -> Result<ReleaseRecord> {
        Ok(self.store.get_release(release_id).await?)
    }

    pub async fn list_releases(
        &self,
        repository_id: Option<&RepositoryId>,
    ) -> Result<Vec<ReleaseRecord>> {
        Ok(self.store.list_releases(repository_id).await?)
    }

    /// Update descriptive fields only; statuses and `verified` are untouched.
    #[instrument(skip(self, patch), fields(release_id = %release_id))]
    pub async fn update_release(
        &self,
        release_id: &ReleaseId,
        patch: ReleasePatch,
    ) -> Result<ReleaseRecord> {
        validate_patch(&patch)?;
        Ok(self.store.update_fields(release_id, patch).await?)
    }

    #[instrument(skip(self), fields(release_id = %release_id))]
    pub async fn delete_release(&self, release_id: &ReleaseId) -> Result<()> {
        Ok(self.store.delete_release(release_id, None).await?)
    }

    // ========== Verification entries ==========

    /// Load, append and save the whole document. Never evaluates.
    #[instrument(skip(self, status), fields(release_id = %release_id, reviewer_id = %status.reviewer_id))]
    pub async fn append_status(
        &self,
        release_id: &ReleaseId,
        status: NewStatus,
    ) -> Result<ReleaseRecord> {
        let entry = status.into_entry(release_id)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut release = self.store.get_release(release_id).await?;
            release.statuses.push(entry.clone());

            match self.store.replace_release(&release).await {
                Ok(saved) => {
                    obs::emit_status_appended(
                        release_id.as_str(),
                        &entry.reviewer_id,
                        false,
                        saved.statuses.len(),
                    );
                    return Ok(saved);
                }
                Err(err) => self.retry_or_fail(release_id, attempt, err)?,
            }
        }
    }

    /// Append with a single atomic push. Never evaluates.
    #[instrument(skip(self, status), fields(release_id = %release_id, reviewer_id = %status.reviewer_id))]
    pub async fn push_status(
        &self,
        release_id: &ReleaseId,
        status: NewStatus,
    ) -> Result<ReleaseRecord> {
        let entry = status.into_entry(release_id)?;
        let reviewer_id = entry.reviewer_id.clone();

        let saved = self.store.push_status(release_id, entry).await?;
        obs::emit_status_appended(release_id.as_str(), &reviewer_id, true, saved.statuses.len());
        Ok(saved)
    }

    /// Patch one entry, then reject, verify or unverify the release by majority.
    ///
    /// Order is fixed: patch, rejection test, approval test, persist. A
    /// rejection deletes the release and skips the approval test entirely.
    #[instrument(skip(self, patch), fields(release_id = %release_id, status_id = %status_id))]
    pub async fn update_status_and_evaluate(
        &self,
        release_id: &ReleaseId,
        status_id: &StatusId,
        patch: StatusPatch,
    ) -> Result<StatusUpdate> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut release = self.store.get_release(release_id).await?;
            let entry =
                release
                    .status_mut(status_id)
                    .ok_or_else(|| ReviewError::StatusNotFound {
                        release_id: release_id.0.clone(),
                        status_id: status_id.0.clone(),
                    })?;
            patch.apply(entry);

            let tally = Tally::of(&release.statuses);
            let verdict = evaluate(&release.statuses, release.verified);

            let written = match verdict.verified_flag(release.verified) {
                None => self
                    .store
                    .delete_release(release_id, Some(release.version))
                    .await
                    .map(|()| StatusUpdate::Deleted {
                        release_id: release_id.clone(),
                    }),
                Some(verified) => {
                    release.verified = verified;
                    self.store
                        .replace_release(&release)
                        .await
                        .map(StatusUpdate::Updated)
                }
            };

            match written {
                Ok(outcome) => {
                    obs::emit_release_evaluated(release_id.as_str(), &tally, verdict, attempt);
                    if let StatusUpdate::Deleted { .. } = outcome {
                        obs::emit_release_rejected(
                            release_id.as_str(),
                            tally.rejections,
                            tally.total,
                        );
                    }
                    return Ok(outcome);
                }
                Err(err) => self.retry_or_fail(release_id, attempt, err)?,
            }
        }
    }

    /// Identifier of the first entry assigned to `reviewer_id`.
    #[instrument(skip(self), fields(release_id = %release_id, reviewer_id = %reviewer_id))]
    pub async fn find_status_by_reviewer(
        &self,
        release_id: &ReleaseId,
        reviewer_id: &str,
    ) -> Result<StatusId> {
        let release = self.store.get_release(release_id).await?;
        release
            .statuses
            .iter()
            .find(|s| s.reviewer_id == reviewer_id)
            .map(|s| s.id.clone())
            .ok_or_else(|| ReviewError::StatusNotFound {
                release_id: release_id.0.clone(),
                status_id: format!("reviewer:{}", reviewer_id),
            })
    }

    /// Most recently created verified release of a repository.
    #[instrument(skip(self), fields(repository_id = %repository_id))]
    pub async fn latest_verified(&self, repository_id: &RepositoryId) -> Result<ReleaseRecord> {
        self.store
            .latest_verified(repository_id)
            .await?
            .filter(|release| release.verified)
            .ok_or_else(|| ReviewError::NoVerifiedRelease(repository_id.0.clone()))
    }

    /// `Ok(())` means "reload and try again"; anything else ends the operation.
    fn retry_or_fail(&self, release_id: &ReleaseId, attempt: u32, err: StorageError) -> Result<()> {
        match err {
            StorageError::VersionConflict { .. } if attempt < self.max_attempts => {
                obs::emit_update_conflict(release_id.as_str(), attempt, self.max_attempts);
                Ok(())
            }
            StorageError::VersionConflict { .. } => {
                obs::emit_update_conflict(release_id.as_str(), attempt, self.max_attempts);
                Err(ReviewError::Conflict {
                    release_id: release_id.0.clone(),
                    attempts: attempt,
                })
            }
            other => Err(other.into()),
        }
    }
}

impl std::fmt::Debug for ReleaseReview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseReview")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tracing_test::traced_test;
    use vizrev_state::fakes::MemoryReleaseStore;
    use vizrev_state::{StorageResult, VerificationEntry};

    fn review() -> ReleaseReview {
        ReleaseReview::new(Arc::new(MemoryReleaseStore::new()))
    }

    #[tokio::test]
    async fn test_append_status_does_not_evaluate() {
        let review = review();
        let release = review
            .create_release(NewRelease::new("repo", "v1"))
            .await
            .unwrap();

        let updated = review
            .append_status(&release.id, NewStatus::judgment("alice", true))
            .await
            .unwrap();

        assert_eq!(updated.statuses.len(), 1);
        assert!(!updated.verified, "append must not run the approval test");
    }

    #[tokio::test]
    async fn test_find_status_by_reviewer_returns_first_match() {
        let review = review();
        let release = review
            .create_release(NewRelease::new("repo", "v1").with_reviewers(["alice", "bob", "alice"]))
            .await
            .unwrap();

        let status_id = review
            .find_status_by_reviewer(&release.id, "alice")
            .await
            .unwrap();
        assert_eq!(status_id, release.statuses[0].id);
    }

    #[tokio::test]
    async fn test_unknown_status_id_is_not_found() {
        let review = review();
        let release = review
            .create_release(NewRelease::new("repo", "v1").with_reviewers(["alice"]))
            .await
            .unwrap();

        let err = review
            .update_status_and_evaluate(&release.id, &StatusId::new(), StatusPatch::reviewed(true))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::StatusNotFound { .. }));
    }

    /// Lets a rival reviewer append once, just before the first full write.
    struct OutracedOnce {
        inner: MemoryReleaseStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl ReleaseStore for OutracedOnce {
        async fn insert_release(&self, record: ReleaseRecord) -> StorageResult<ReleaseRecord> {
            self.inner.insert_release(record).await
        }

        async fn get_release(&self, release_id: &ReleaseId) -> StorageResult<ReleaseRecord> {
            self.inner.get_release(release_id).await
        }

        async fn list_releases(
            &self,
            repository_id: Option<&RepositoryId>,
        ) -> StorageResult<Vec<ReleaseRecord>> {
            self.inner.list_releases(repository_id).await
        }

        async fn replace_release(&self, record: &ReleaseRecord) -> StorageResult<ReleaseRecord> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let rival = VerificationEntry::assigned(record.id.0.clone(), "carol");
                self.inner.push_status(&record.id, rival).await?;
            }
            self.inner.replace_release(record).await
        }

        async fn update_fields(
            &self,
            release_id: &ReleaseId,
            patch: ReleasePatch,
        ) -> StorageResult<ReleaseRecord> {
            self.inner.update_fields(release_id, patch).await
        }

        async fn push_status(
            &self,
            release_id: &ReleaseId,
            entry: VerificationEntry,
        ) -> StorageResult<ReleaseRecord> {
            self.inner.push_status(release_id, entry).await
        }

        async fn delete_release(
            &self,
            release_id: &ReleaseId,
            expected_version: Option<u64>,
        ) -> StorageResult<()> {
            self.inner.delete_release(release_id, expected_version).await
        }

        async fn latest_verified(
            &self,
            repository_id: &RepositoryId,
        ) -> StorageResult<Option<ReleaseRecord>> {
            self.inner.latest_verified(repository_id).await
        }

        async fn verified_repository_ids(&self) -> StorageResult<Vec<RepositoryId>> {
            self.inner.verified_repository_ids().await
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_lost_race_logs_only_the_applied_evaluation() {
        let review = ReleaseReview::new(Arc::new(OutracedOnce {
            inner: MemoryReleaseStore::new(),
            raced: AtomicBool::new(false),
        }));
        let release = review
            .create_release(NewRelease::new("repo", "v1").with_reviewers(["alice", "bob"]))
            .await
            .unwrap();

        let outcome = review
            .update_status_and_evaluate(
                &release.id,
                &release.statuses[0].id,
                StatusPatch::reviewed(true),
            )
            .await
            .unwrap();

        let StatusUpdate::Updated(saved) = outcome else {
            panic!("expected the release to be kept");
        };
        assert_eq!(saved.statuses.len(), 3);
        assert!(logs_contain("release.update_conflict"));
        logs_assert(|lines: &[&str]| {
            let evaluated: Vec<_> = lines
                .iter()
                .filter(|line| line.contains("release.evaluated"))
                .collect();
            match evaluated.as_slice() {
                [line] if line.contains("attempt=2") => Ok(()),
                other => Err(format!("expected one evaluation on attempt 2, got {:?}", other)),
            }
        });
    }

    #[test]
    fn test_max_attempts_floor_is_one() {
        assert_eq!(review().with_max_attempts(0).max_attempts(), 1);
    }
}
