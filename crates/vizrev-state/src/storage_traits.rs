//! Storage trait definitions for vizrev
//!
//! These traits define the persistence boundary of the review workflow:
//! - `ReleaseStore`: releases and their embedded verification entries
//! - `RepositoryStore`: repository documents and their `verified` flag
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random identifier
            pub fn new() -> Self {
                $name(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier of a release
    ReleaseId
);
string_id!(
    /// Identifier of a verification entry inside a release
    StatusId
);
string_id!(
    /// Identifier of a repository
    RepositoryId
);

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One reviewer's judgment on one release.
///
/// Entries have no identity outside their release; `id` is only unique
/// within the parent's `statuses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEntry {
    pub id: StatusId,
    #[serde(rename = "releaseID")]
    pub release_id: String,
    #[serde(rename = "reviewerID")]
    pub reviewer_id: String,
    pub is_reviewed: bool,
    pub is_safe: bool,
    pub additional_comments: String,
    pub review_date: DateTime<Utc>,
}

impl VerificationEntry {
    /// An empty assignment: not reviewed, not safe, no comments.
    pub fn assigned(release_id: impl Into<String>, reviewer_id: impl Into<String>) -> Self {
        Self {
            id: StatusId::new(),
            release_id: release_id.into(),
            reviewer_id: reviewer_id.into(),
            is_reviewed: false,
            is_safe: false,
            additional_comments: String::new(),
            review_date: Utc::now(),
        }
    }

    /// Whether this entry counts towards rejection.
    pub fn is_rejection(&self) -> bool {
        self.is_reviewed && !self.is_safe
    }
}

/// A release document with its embedded verification entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub id: ReleaseId,
    #[serde(rename = "repositoryID")]
    pub repository_id: RepositoryId,
    pub name: String,
    pub description: String,
    #[serde(rename = "codesandbox_URL")]
    pub codesandbox_url: String,
    pub created_at: DateTime<Utc>,
    /// Cached outcome of the last evaluation pass.
    pub verified: bool,
    /// Revision counter, bumped by every successful write.
    pub version: u64,
    /// Insertion order is review assignment order.
    pub statuses: Vec<VerificationEntry>,
}

impl ReleaseRecord {
    pub fn new(repository_id: RepositoryId, name: impl Into<String>) -> Self {
        Self {
            id: ReleaseId::new(),
            repository_id,
            name: name.into(),
            description: String::new(),
            codesandbox_url: String::new(),
            created_at: Utc::now(),
            verified: false,
            version: 0,
            statuses: Vec::new(),
        }
    }

    pub fn status_mut(&mut self, status_id: &StatusId) -> Option<&mut VerificationEntry> {
        self.statuses.iter_mut().find(|s| &s.id == status_id)
    }
}

/// Field-level update of a release's descriptive fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "codesandbox_URL")]
    pub codesandbox_url: Option<String>,
}

impl ReleasePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.codesandbox_url.is_none()
    }

    pub fn apply(&self, record: &mut ReleaseRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(url) = &self.codesandbox_url {
            record.codesandbox_url = url.clone();
        }
    }
}

/// A repository document. Only the fields the review workflow reads are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    #[serde(rename = "repositoryID")]
    pub id: RepositoryId,
    pub title: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepositoryRecord {
    pub fn new(id: RepositoryId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// ReleaseStore
// ---------------------------------------------------------------------------

/// Release persistence.
///
/// Guarantees:
/// - `replace_release` and a versioned `delete_release` only apply when the
///   stored `version` equals the caller's; otherwise `VersionConflict`.
/// - Writes against a missing release fail with `ReleaseNotFound`.
/// - Every successful write increments `version` by one.
/// - `push_status` appends in a single atomic step.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Insert a new release document.
    async fn insert_release(&self, record: ReleaseRecord) -> StorageResult<ReleaseRecord>;

    /// Load a release by id.
    async fn get_release(&self, release_id: &ReleaseId) -> StorageResult<ReleaseRecord>;

    /// List releases, newest first, optionally restricted to one repository.
    async fn list_releases(
        &self,
        repository_id: Option<&RepositoryId>,
    ) -> StorageResult<Vec<ReleaseRecord>>;

    /// Overwrite statuses and `verified` if `record.version` is still current.
    async fn replace_release(&self, record: &ReleaseRecord) -> StorageResult<ReleaseRecord>;

    /// Atomically set descriptive fields.
    async fn update_fields(
        &self,
        release_id: &ReleaseId,
        patch: ReleasePatch,
    ) -> StorageResult<ReleaseRecord>;

    /// Atomically append a verification entry.
    async fn push_status(
        &self,
        release_id: &ReleaseId,
        entry: VerificationEntry,
    ) -> StorageResult<ReleaseRecord>;

    /// Delete a release. With `expected_version`, only if it is still current.
    async fn delete_release(
        &self,
        release_id: &ReleaseId,
        expected_version: Option<u64>,
    ) -> StorageResult<()>;

    /// Most recently created verified release of a repository.
    async fn latest_verified(
        &self,
        repository_id: &RepositoryId,
    ) -> StorageResult<Option<ReleaseRecord>>;

    /// Repository ids of every verified release (duplicates allowed).
    async fn verified_repository_ids(&self) -> StorageResult<Vec<RepositoryId>>;
}

// ---------------------------------------------------------------------------
// RepositoryStore
// ---------------------------------------------------------------------------

/// Repository persistence, limited to what verification sync needs.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn insert_repository(&self, record: RepositoryRecord)
        -> StorageResult<RepositoryRecord>;

    async fn get_repository(&self, repository_id: &RepositoryId)
        -> StorageResult<RepositoryRecord>;

    /// Set `verified = true` on every listed repository that is not verified yet.
    /// Returns how many repositories changed.
    async fn mark_verified(&self, repository_ids: &[RepositoryId]) -> StorageResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_record_wire_names() {
        let mut release = ReleaseRecord::new(RepositoryId::from("repo-1"), "v1");
        release
            .statuses
            .push(VerificationEntry::assigned(release.id.as_str(), "alice"));

        let json = serde_json::to_value(&release).unwrap();
        assert_eq!(json["repositoryID"], "repo-1");
        assert_eq!(json["codesandbox_URL"], "");
        assert_eq!(json["verified"], false);
        assert_eq!(json["statuses"][0]["reviewerID"], "alice");
        assert_eq!(json["statuses"][0]["isReviewed"], false);
        assert_eq!(json["statuses"][0]["additionalComments"], "");
    }

    #[test]
    fn test_rejection_requires_review() {
        let mut entry = VerificationEntry::assigned("r", "bob");
        assert!(!entry.is_rejection());
        entry.is_reviewed = true;
        assert!(entry.is_rejection());
        entry.is_safe = true;
        assert!(!entry.is_rejection());
    }

    #[test]
    fn test_release_patch_applies_only_present_fields() {
        let mut release = ReleaseRecord::new(RepositoryId::from("repo"), "old");
        release.description = "keep me".to_string();
        let patch = ReleasePatch {
            name: Some("new".to_string()),
            ..Default::default()
        };
        patch.apply(&mut release);
        assert_eq!(release.name, "new");
        assert_eq!(release.description, "keep me");
        assert!(ReleasePatch::default().is_empty());
    }
}
