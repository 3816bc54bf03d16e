//! Error types for vizrev-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

/// Errors returned by the release and repository stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("release not found: {release_id}")]
    ReleaseNotFound { release_id: String },

    #[error("repository not found: {repository_id}")]
    RepositoryNotFound { repository_id: String },

    /// The stored revision moved on since the caller loaded the document.
    #[error("release {release_id} changed concurrently (expected version {expected})")]
    VersionConflict { release_id: String, expected: u64 },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
