//! SurrealDB Handle - Connection and Operations
//!
//! Manages connection and provides methods for:
//! - release documents with embedded verification entries
//! - version-conditional writes and deletes
//! - repository `verified` flag promotion
//!
//! Supports local (in-memory or surrealkv file) and cloud (WebSocket) connections.

use crate::error::StateError;
use crate::storage_traits::{
    ReleaseId, ReleasePatch, ReleaseRecord, RepositoryId, RepositoryRecord, StorageResult,
    VerificationEntry,
};
use crate::Result;
use crate::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

const DEFAULT_NAMESPACE: &str = "vizrev";
const DEFAULT_DATABASE: &str = "main";

/// Configuration for SurrealDB Cloud connection
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    /// Database username
    pub username: String,
    /// Database password
    pub password: String,
    /// Namespace (default: "vizrev")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_ENDPOINT (required)
    /// - SURREALDB_USERNAME (required)
    /// - SURREALDB_PASSWORD (required)
    /// - SURREALDB_NAMESPACE (optional, default: "vizrev")
    /// - SURREALDB_DATABASE (optional, default: "main")
    /// - SURREALDB_ROOT (optional, default: "false") - set to "true" for root users
    pub fn from_env() -> std::result::Result<Self, String> {
        let endpoint =
            std::env::var("SURREALDB_ENDPOINT").map_err(|_| "SURREALDB_ENDPOINT not set")?;
        let username =
            std::env::var("SURREALDB_USERNAME").map_err(|_| "SURREALDB_USERNAME not set")?;
        let password =
            std::env::var("SURREALDB_PASSWORD").map_err(|_| "SURREALDB_PASSWORD not set")?;
        let namespace = std::env::var("SURREALDB_NAMESPACE")
            .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());
        let database =
            std::env::var("SURREALDB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
        let is_root = std::env::var("SURREALDB_ROOT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            endpoint,
            username,
            password,
            namespace,
            database,
            is_root,
        })
    }
}

/// SurrealDB connection handle for vizrev
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbRelease {
    release_id: String,
    repository_id: String,
    name: String,
    description: String,
    codesandbox_url: String,
    created_at: SurrealDatetime,
    verified: bool,
    version: u64,
    statuses: Vec<VerificationEntry>,
}

impl DbRelease {
    fn from_record(record: ReleaseRecord) -> Self {
        Self {
            release_id: record.id.0,
            repository_id: record.repository_id.0,
            name: record.name,
            description: record.description,
            codesandbox_url: record.codesandbox_url,
            created_at: SurrealDatetime::from(record.created_at),
            verified: record.verified,
            version: record.version,
            statuses: record.statuses,
        }
    }

    fn into_record(self) -> ReleaseRecord {
        ReleaseRecord {
            id: ReleaseId(self.release_id),
            repository_id: RepositoryId(self.repository_id),
            name: self.name,
            description: self.description,
            codesandbox_url: self.codesandbox_url,
            created_at: DateTime::<Utc>::from(self.created_at),
            verified: self.verified,
            version: self.version,
            statuses: self.statuses,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbRepository {
    repository_id: String,
    title: String,
    verified: bool,
    created_at: SurrealDatetime,
    updated_at: SurrealDatetime,
}

impl DbRepository {
    fn from_record(record: RepositoryRecord) -> Self {
        Self {
            repository_id: record.id.0,
            title: record.title,
            verified: record.verified,
            created_at: SurrealDatetime::from(record.created_at),
            updated_at: SurrealDatetime::from(record.updated_at),
        }
    }

    fn into_record(self) -> RepositoryRecord {
        RepositoryRecord {
            id: RepositoryId(self.repository_id),
            title: self.title,
            verified: self.verified,
            created_at: DateTime::<Utc>::from(self.created_at),
            updated_at: DateTime::<Utc>::from(self.updated_at),
        }
    }
}

fn release_not_found(release_id: &ReleaseId) -> StorageError {
    StorageError::ReleaseNotFound {
        release_id: release_id.0.clone(),
    }
}

impl SurrealHandle {
    /// Connect to SurrealDB in-memory and set up schema
    #[instrument(skip_all)]
    pub async fn setup_db() -> Result<Self> {
        info!("Connecting to SurrealDB (in-memory)");
        Self::setup_at("mem://").await
    }

    /// Connect to an explicit engine URL (`mem://`, `surrealkv://path`, `ws://host:port`)
    #[instrument(skip_all, fields(url = %url))]
    pub async fn setup_at(url: &str) -> Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(DEFAULT_NAMESPACE)
            .use_db(DEFAULT_DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        let handle = SurrealHandle { db };
        handle.init_schema().await?;

        info!("SurrealDB connected and schema initialized");
        Ok(handle)
    }

    /// Connect to SurrealDB Cloud
    ///
    /// # Example
    /// ```ignore
    /// let config = CloudConfig::from_env()?;
    /// let handle = SurrealHandle::setup_cloud(config).await?;
    /// ```
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
    pub async fn setup_cloud(config: CloudConfig) -> Result<Self> {
        info!("Connecting to SurrealDB Cloud (root={})", config.is_root);

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root authentication failed: {}", e)))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| {
                StateError::Connection(format!("Database authentication failed: {}", e))
            })?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        let handle = SurrealHandle { db };
        handle.init_schema().await?;

        info!("SurrealDB Cloud connected and schema initialized");
        Ok(handle)
    }

    /// Connect using environment variables
    ///
    /// If SURREALDB_ENDPOINT is set, connects to cloud.
    /// If SURREALDB_URL is set, connects to that URL.
    /// Otherwise, falls back to in-memory.
    #[instrument(skip_all)]
    pub async fn setup_from_env() -> Result<Self> {
        if let Ok(config) = CloudConfig::from_env() {
            info!("Cloud config found, connecting to SurrealDB Cloud");
            return Self::setup_cloud(config).await;
        }

        if let Ok(url) = std::env::var("SURREALDB_URL") {
            info!("SURREALDB_URL found, connecting to {}", url);
            return Self::setup_at(&url).await;
        }

        info!("No database config found, using in-memory database");
        Self::setup_db().await
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> Result<()> {
        debug!("Initializing vizrev schema");

        // Statuses stay schemaless: they are embedded objects owned by the release.
        let schema = r#"
            -- Releases table (document with embedded verification entries)
            DEFINE TABLE IF NOT EXISTS releases SCHEMALESS;
            DEFINE FIELD IF NOT EXISTS release_id ON releases TYPE string;
            DEFINE FIELD IF NOT EXISTS repository_id ON releases TYPE string;
            DEFINE FIELD IF NOT EXISTS created_at ON releases TYPE datetime;
            DEFINE FIELD IF NOT EXISTS verified ON releases TYPE bool;
            DEFINE FIELD IF NOT EXISTS version ON releases TYPE int;
            DEFINE INDEX IF NOT EXISTS idx_release_id ON releases FIELDS release_id UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_release_repo_verified ON releases FIELDS repository_id, verified;

            -- Repositories table (only the verification-relevant fields)
            DEFINE TABLE IF NOT EXISTS repositories SCHEMALESS;
            DEFINE FIELD IF NOT EXISTS repository_id ON repositories TYPE string;
            DEFINE FIELD IF NOT EXISTS verified ON repositories TYPE bool;
            DEFINE FIELD IF NOT EXISTS updated_at ON repositories TYPE datetime;
            DEFINE INDEX IF NOT EXISTS idx_repository_id ON repositories FIELDS repository_id UNIQUE;
        "#;

        self.db
            .query(schema)
            .await
            .and_then(|response| response.check())
            .map_err(|e| StateError::SchemaSetup(e.to_string()))?;

        debug!("Schema initialized successfully");
        Ok(())
    }

    // ========== Release Operations ==========

    /// Insert a new release document.
    #[instrument(skip(self, record), fields(release_id = %record.id, repository_id = %record.repository_id))]
    pub async fn release_insert(&self, record: ReleaseRecord) -> StorageResult<ReleaseRecord> {
        debug!("Inserting release");

        let created: Option<DbRelease> = self
            .db
            .create("releases")
            .content(DbRelease::from_record(record))
            .await?;

        created
            .map(DbRelease::into_record)
            .ok_or_else(|| StorageError::Backend("failed to create release record".to_string()))
    }

    /// Load a release by id.
    #[instrument(skip(self), fields(release_id = %release_id))]
    pub async fn release_get(&self, release_id: &ReleaseId) -> StorageResult<ReleaseRecord> {
        self.release_find(release_id)
            .await?
            .ok_or_else(|| release_not_found(release_id))
    }

    async fn release_find(&self, release_id: &ReleaseId) -> StorageResult<Option<ReleaseRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM releases WHERE release_id = $id")
            .bind(("id", release_id.0.clone()))
            .await?;

        let releases: Vec<DbRelease> = result.take(0)?;
        Ok(releases.into_iter().next().map(DbRelease::into_record))
    }

    /// List releases (newest first), optionally for a single repository.
    #[instrument(skip(self))]
    pub async fn release_list(
        &self,
        repository_id: Option<&RepositoryId>,
    ) -> StorageResult<Vec<ReleaseRecord>> {
        let mut result = match repository_id {
            Some(repo) => {
                self.db
                    .query(
                        "SELECT * FROM releases WHERE repository_id = $repo ORDER BY created_at DESC",
                    )
                    .bind(("repo", repo.0.clone()))
                    .await?
            }
            None => {
                self.db
                    .query("SELECT * FROM releases ORDER BY created_at DESC")
                    .await?
            }
        };

        let releases: Vec<DbRelease> = result.take(0)?;
        Ok(releases.into_iter().map(DbRelease::into_record).collect())
    }

    /// Overwrite statuses and `verified`, conditional on the caller's version.
    #[instrument(skip(self, record), fields(release_id = %record.id, version = record.version))]
    pub async fn release_replace(&self, record: &ReleaseRecord) -> StorageResult<ReleaseRecord> {
        let mut result = self
            .db
            .query(
                "UPDATE releases SET statuses = $statuses, verified = $verified, version += 1 \
                 WHERE release_id = $id AND version = $expected RETURN AFTER",
            )
            .bind(("statuses", record.statuses.clone()))
            .bind(("verified", record.verified))
            .bind(("id", record.id.0.clone()))
            .bind(("expected", record.version))
            .await?;

        let updated: Vec<DbRelease> = result.take(0)?;
        match updated.into_iter().next() {
            Some(row) => Ok(row.into_record()),
            None => Err(self.write_miss(&record.id, record.version).await),
        }
    }

    /// Atomically set descriptive fields.
    #[instrument(skip(self, patch), fields(release_id = %release_id))]
    pub async fn release_update_fields(
        &self,
        release_id: &ReleaseId,
        patch: ReleasePatch,
    ) -> StorageResult<ReleaseRecord> {
        if patch.is_empty() {
            return self.release_get(release_id).await;
        }

        let mut assignments = Vec::new();
        if patch.name.is_some() {
            assignments.push("name = $name");
        }
        if patch.description.is_some() {
            assignments.push("description = $description");
        }
        if patch.codesandbox_url.is_some() {
            assignments.push("codesandbox_url = $codesandbox_url");
        }
        let sql = format!(
            "UPDATE releases SET {}, version += 1 WHERE release_id = $id RETURN AFTER",
            assignments.join(", ")
        );

        let mut result = self
            .db
            .query(sql)
            .bind(("id", release_id.0.clone()))
            .bind(("name", patch.name))
            .bind(("description", patch.description))
            .bind(("codesandbox_url", patch.codesandbox_url))
            .await?;

        let updated: Vec<DbRelease> = result.take(0)?;
        updated
            .into_iter()
            .next()
            .map(DbRelease::into_record)
            .ok_or_else(|| release_not_found(release_id))
    }

    /// Atomically append a verification entry.
    #[instrument(skip(self, entry), fields(release_id = %release_id, reviewer_id = %entry.reviewer_id))]
    pub async fn release_push_status(
        &self,
        release_id: &ReleaseId,
        entry: VerificationEntry,
    ) -> StorageResult<ReleaseRecord> {
        let mut result = self
            .db
            .query(
                "UPDATE releases SET statuses += $entry, version += 1 \
                 WHERE release_id = $id RETURN AFTER",
            )
            .bind(("entry", entry))
            .bind(("id", release_id.0.clone()))
            .await?;

        let updated: Vec<DbRelease> = result.take(0)?;
        updated
            .into_iter()
            .next()
            .map(DbRelease::into_record)
            .ok_or_else(|| release_not_found(release_id))
    }

    /// Delete a release, optionally only if `expected_version` is still current.
    #[instrument(skip(self), fields(release_id = %release_id))]
    pub async fn release_delete(
        &self,
        release_id: &ReleaseId,
        expected_version: Option<u64>,
    ) -> StorageResult<()> {
        debug!("Deleting release");

        let mut result = match expected_version {
            Some(expected) => {
                self.db
                    .query(
                        "DELETE FROM releases WHERE release_id = $id AND version = $expected \
                         RETURN BEFORE",
                    )
                    .bind(("id", release_id.0.clone()))
                    .bind(("expected", expected))
                    .await?
            }
            None => {
                self.db
                    .query("DELETE FROM releases WHERE release_id = $id RETURN BEFORE")
                    .bind(("id", release_id.0.clone()))
                    .await?
            }
        };

        let deleted: Vec<DbRelease> = result.take(0)?;
        if !deleted.is_empty() {
            return Ok(());
        }
        match expected_version {
            Some(expected) => Err(self.write_miss(release_id, expected).await),
            None => Err(release_not_found(release_id)),
        }
    }

    /// Classify a conditional write that matched nothing.
    async fn write_miss(&self, release_id: &ReleaseId, expected: u64) -> StorageError {
        match self.release_find(release_id).await {
            Ok(Some(_)) => StorageError::VersionConflict {
                release_id: release_id.0.clone(),
                expected,
            },
            Ok(None) => release_not_found(release_id),
            Err(e) => e,
        }
    }

    /// Most recently created verified release of a repository.
    #[instrument(skip(self), fields(repository_id = %repository_id))]
    pub async fn release_latest_verified(
        &self,
        repository_id: &RepositoryId,
    ) -> StorageResult<Option<ReleaseRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM releases WHERE repository_id = $repo AND verified = true \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("repo", repository_id.0.clone()))
            .await?;

        let releases: Vec<DbRelease> = result.take(0)?;
        Ok(releases.into_iter().next().map(DbRelease::into_record))
    }

    /// Repository ids of all verified releases.
    #[instrument(skip(self))]
    pub async fn release_verified_repository_ids(&self) -> StorageResult<Vec<RepositoryId>> {
        let mut result = self
            .db
            .query("SELECT repository_id FROM releases WHERE verified = true")
            .await?;

        #[derive(serde::Deserialize)]
        struct RepositoryIdRow {
            repository_id: String,
        }

        let rows: Vec<RepositoryIdRow> = result.take(0)?;
        Ok(rows
            .into_iter()
            .map(|row| RepositoryId(row.repository_id))
            .collect())
    }

    // ========== Repository Operations ==========

    /// Insert a repository document.
    #[instrument(skip(self, record), fields(repository_id = %record.id))]
    pub async fn repository_insert(
        &self,
        record: RepositoryRecord,
    ) -> StorageResult<RepositoryRecord> {
        let created: Option<DbRepository> = self
            .db
            .create("repositories")
            .content(DbRepository::from_record(record))
            .await?;

        created
            .map(DbRepository::into_record)
            .ok_or_else(|| StorageError::Backend("failed to create repository record".to_string()))
    }

    /// Load a repository by id.
    #[instrument(skip(self), fields(repository_id = %repository_id))]
    pub async fn repository_get(
        &self,
        repository_id: &RepositoryId,
    ) -> StorageResult<RepositoryRecord> {
        let mut result = self
            .db
            .query("SELECT * FROM repositories WHERE repository_id = $id")
            .bind(("id", repository_id.0.clone()))
            .await?;

        let repositories: Vec<DbRepository> = result.take(0)?;
        repositories
            .into_iter()
            .next()
            .map(DbRepository::into_record)
            .ok_or_else(|| StorageError::RepositoryNotFound {
                repository_id: repository_id.0.clone(),
            })
    }

    /// Bulk-promote unverified repositories in `repository_ids`.
    #[instrument(skip(self, repository_ids), fields(candidates = repository_ids.len()))]
    pub async fn repository_mark_verified(
        &self,
        repository_ids: &[RepositoryId],
    ) -> StorageResult<u64> {
        let ids: Vec<String> = repository_ids.iter().map(|id| id.0.clone()).collect();

        let mut result = self
            .db
            .query(
                "UPDATE repositories SET verified = true, updated_at = time::now() \
                 WHERE repository_id IN $ids AND verified = false RETURN AFTER",
            )
            .bind(("ids", ids))
            .await?;

        let updated: Vec<DbRepository> = result.take(0)?;
        info!(promoted = updated.len(), "Repositories marked verified");
        Ok(updated.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_for(repo: &str) -> ReleaseRecord {
        let mut release = ReleaseRecord::new(RepositoryId::from(repo), "v1.0.0");
        release.description = "first cut".to_string();
        release
    }

    #[tokio::test]
    async fn test_surreal_connection_and_schema_creation() {
        let handle = SurrealHandle::setup_db().await;
        assert!(handle.is_ok(), "Failed to connect: {:?}", handle.err());
    }

    #[tokio::test]
    async fn test_release_insert_and_get() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let release = release_for("repo-a");

        let saved = handle.release_insert(release.clone()).await.unwrap();
        assert_eq!(saved.id, release.id);

        let loaded = handle.release_get(&release.id).await.unwrap();
        assert_eq!(loaded.name, "v1.0.0");
        assert_eq!(loaded.description, "first cut");
        assert_eq!(loaded.version, 0);
        assert!(!loaded.verified);
    }

    #[tokio::test]
    async fn test_push_status_appends_and_bumps_version() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let release = handle.release_insert(release_for("repo-a")).await.unwrap();

        let entry = VerificationEntry::assigned(release.id.as_str(), "alice");
        let updated = handle
            .release_push_status(&release.id, entry.clone())
            .await
            .unwrap();

        assert_eq!(updated.version, 1);
        assert_eq!(updated.statuses.len(), 1);
        assert_eq!(updated.statuses[0].id, entry.id);
        assert_eq!(updated.statuses[0].reviewer_id, "alice");
    }

    #[tokio::test]
    async fn test_replace_with_stale_version_conflicts() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let release = handle.release_insert(release_for("repo-a")).await.unwrap();

        let mut first = release.clone();
        first.verified = true;
        handle.release_replace(&first).await.unwrap();

        // Still carries version 0.
        let err = handle.release_replace(&release).await.unwrap_err();
        assert!(matches!(err, StorageError::VersionConflict { expected: 0, .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_release_is_not_found() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let release = handle.release_insert(release_for("repo-a")).await.unwrap();

        handle.release_delete(&release.id, Some(0)).await.unwrap();

        let err = handle.release_delete(&release.id, Some(0)).await.unwrap_err();
        assert!(matches!(err, StorageError::ReleaseNotFound { .. }));
        let err = handle.release_get(&release.id).await.unwrap_err();
        assert!(matches!(err, StorageError::ReleaseNotFound { .. }));
    }
}
