//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryReleaseStore` and `MemoryRepositoryStore` that satisfy the
//! trait contracts without any external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

fn release_not_found(release_id: &ReleaseId) -> StorageError {
    StorageError::ReleaseNotFound {
        release_id: release_id.0.clone(),
    }
}

fn newest_first(records: &mut [ReleaseRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

// ---------------------------------------------------------------------------
// MemoryReleaseStore
// ---------------------------------------------------------------------------

/// In-memory release store backed by a `HashMap<ReleaseId, ReleaseRecord>`.
#[derive(Debug, Default)]
pub struct MemoryReleaseStore {
    releases: Mutex<HashMap<String, ReleaseRecord>>,
}

impl MemoryReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReleaseStore for MemoryReleaseStore {
    async fn insert_release(&self, record: ReleaseRecord) -> StorageResult<ReleaseRecord> {
        let mut releases = self.releases.lock().unwrap();
        if releases.contains_key(&record.id.0) {
            return Err(StorageError::Backend(format!(
                "release {} already exists",
                record.id
            )));
        }
        releases.insert(record.id.0.clone(), record.clone());
        Ok(record)
    }

    async fn get_release(&self, release_id: &ReleaseId) -> StorageResult<ReleaseRecord> {
        let releases = self.releases.lock().unwrap();
        releases
            .get(&release_id.0)
            .cloned()
            .ok_or_else(|| release_not_found(release_id))
    }

    async fn list_releases(
        &self,
        repository_id: Option<&RepositoryId>,
    ) -> StorageResult<Vec<ReleaseRecord>> {
        let releases = self.releases.lock().unwrap();
        let mut records: Vec<ReleaseRecord> = releases
            .values()
            .filter(|r| repository_id.map(|id| r.repository_id == *id).unwrap_or(true))
            .cloned()
            .collect();
        newest_first(&mut records);
        Ok(records)
    }

    async fn replace_release(&self, record: &ReleaseRecord) -> StorageResult<ReleaseRecord> {
        let mut releases = self.releases.lock().unwrap();
        let stored = releases
            .get_mut(&record.id.0)
            .ok_or_else(|| release_not_found(&record.id))?;
        if stored.version != record.version {
            return Err(StorageError::VersionConflict {
                release_id: record.id.0.clone(),
                expected: record.version,
            });
        }
        stored.statuses = record.statuses.clone();
        stored.verified = record.verified;
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn update_fields(
        &self,
        release_id: &ReleaseId,
        patch: ReleasePatch,
    ) -> StorageResult<ReleaseRecord> {
        let mut releases = self.releases.lock().unwrap();
        let stored = releases
            .get_mut(&release_id.0)
            .ok_or_else(|| release_not_found(release_id))?;
        if !patch.is_empty() {
            patch.apply(stored);
            stored.version += 1;
        }
        Ok(stored.clone())
    }

    async fn push_status(
        &self,
        release_id: &ReleaseId,
        entry: VerificationEntry,
    ) -> StorageResult<ReleaseRecord> {
        let mut releases = self.releases.lock().unwrap();
        let stored = releases
            .get_mut(&release_id.0)
            .ok_or_else(|| release_not_found(release_id))?;
        stored.statuses.push(entry);
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete_release(
        &self,
        release_id: &ReleaseId,
        expected_version: Option<u64>,
    ) -> StorageResult<()> {
        let mut releases = self.releases.lock().unwrap();
        let stored = releases
            .get(&release_id.0)
            .ok_or_else(|| release_not_found(release_id))?;
        if let Some(expected) = expected_version {
            if stored.version != expected {
                return Err(StorageError::VersionConflict {
                    release_id: release_id.0.clone(),
                    expected,
                });
            }
        }
        releases.remove(&release_id.0);
        Ok(())
    }

    async fn latest_verified(
        &self,
        repository_id: &RepositoryId,
    ) -> StorageResult<Option<ReleaseRecord>> {
        let releases = self.releases.lock().unwrap();
        Ok(releases
            .values()
            .filter(|r| r.verified && r.repository_id == *repository_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn verified_repository_ids(&self) -> StorageResult<Vec<RepositoryId>> {
        let releases = self.releases.lock().unwrap();
        Ok(releases
            .values()
            .filter(|r| r.verified)
            .map(|r| r.repository_id.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryRepositoryStore
// ---------------------------------------------------------------------------

/// In-memory repository store backed by a `HashMap<RepositoryId, RepositoryRecord>`.
#[derive(Debug, Default)]
pub struct MemoryRepositoryStore {
    repositories: Mutex<HashMap<String, RepositoryRecord>>,
}

impl MemoryRepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryStore for MemoryRepositoryStore {
    async fn insert_repository(
        &self,
        record: RepositoryRecord,
    ) -> StorageResult<RepositoryRecord> {
        let mut repositories = self.repositories.lock().unwrap();
        repositories.insert(record.id.0.clone(), record.clone());
        Ok(record)
    }

    async fn get_repository(
        &self,
        repository_id: &RepositoryId,
    ) -> StorageResult<RepositoryRecord> {
        let repositories = self.repositories.lock().unwrap();
        repositories
            .get(&repository_id.0)
            .cloned()
            .ok_or_else(|| StorageError::RepositoryNotFound {
                repository_id: repository_id.0.clone(),
            })
    }

    async fn mark_verified(&self, repository_ids: &[RepositoryId]) -> StorageResult<u64> {
        let mut repositories = self.repositories.lock().unwrap();
        let mut promoted = 0;
        for repo in repositories.values_mut() {
            if !repo.verified && repository_ids.contains(&repo.id) {
                repo.verified = true;
                repo.updated_at = Utc::now();
                promoted += 1;
            }
        }
        Ok(promoted)
    }
}
