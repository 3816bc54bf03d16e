use std::sync::Arc;

use async_trait::async_trait;

use crate::storage_traits::{
    ReleaseId, ReleasePatch, ReleaseRecord, ReleaseStore, RepositoryId, RepositoryRecord,
    RepositoryStore, StorageResult, VerificationEntry,
};
use crate::SurrealHandle;

/// SurrealDB-backed implementation of the ReleaseStore trait.
#[derive(Clone)]
pub struct SurrealReleaseStore {
    handle: Arc<SurrealHandle>,
}

impl SurrealReleaseStore {
    pub fn new(handle: Arc<SurrealHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl ReleaseStore for SurrealReleaseStore {
    async fn insert_release(&self, record: ReleaseRecord) -> StorageResult<ReleaseRecord> {
        self.handle.release_insert(record).await
    }

    async fn get_release(&self, release_id: &ReleaseId) -> StorageResult<ReleaseRecord> {
        self.handle.release_get(release_id).await
    }

    async fn list_releases(
        &self,
        repository_id: Option<&RepositoryId>,
    ) -> StorageResult<Vec<ReleaseRecord>> {
        self.handle.release_list(repository_id).await
    }

    async fn replace_release(&self, record: &ReleaseRecord) -> StorageResult<ReleaseRecord> {
        self.handle.release_replace(record).await
    }

    async fn update_fields(
        &self,
        release_id: &ReleaseId,
        patch: ReleasePatch,
    ) -> StorageResult<ReleaseRecord> {
        self.handle.release_update_fields(release_id, patch).await
    }

    async fn push_status(
        &self,
        release_id: &ReleaseId,
        entry: VerificationEntry,
    ) -> StorageResult<ReleaseRecord> {
        self.handle.release_push_status(release_id, entry).await
    }

    async fn delete_release(
        &self,
        release_id: &ReleaseId,
        expected_version: Option<u64>,
    ) -> StorageResult<()> {
        self.handle.release_delete(release_id, expected_version).await
    }

    async fn latest_verified(
        &self,
        repository_id: &RepositoryId,
    ) -> StorageResult<Option<ReleaseRecord>> {
        self.handle.release_latest_verified(repository_id).await
    }

    async fn verified_repository_ids(&self) -> StorageResult<Vec<RepositoryId>> {
        self.handle.release_verified_repository_ids().await
    }
}

/// SurrealDB-backed implementation of the RepositoryStore trait.
#[derive(Clone)]
pub struct SurrealRepositoryStore {
    handle: Arc<SurrealHandle>,
}

impl SurrealRepositoryStore {
    pub fn new(handle: Arc<SurrealHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl RepositoryStore for SurrealRepositoryStore {
    async fn insert_repository(
        &self,
        record: RepositoryRecord,
    ) -> StorageResult<RepositoryRecord> {
        self.handle.repository_insert(record).await
    }

    async fn get_repository(
        &self,
        repository_id: &RepositoryId,
    ) -> StorageResult<RepositoryRecord> {
        self.handle.repository_get(repository_id).await
    }

    async fn mark_verified(&self, repository_ids: &[RepositoryId]) -> StorageResult<u64> {
        self.handle.repository_mark_verified(repository_ids).await
    }
}
