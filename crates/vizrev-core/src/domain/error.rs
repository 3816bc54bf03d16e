//! Domain-level error taxonomy for the review workflow.

use vizrev_state::StorageError;

/// Review workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("release not found: {0}")]
    ReleaseNotFound(String),

    #[error("status {status_id} not found on release {release_id}")]
    StatusNotFound {
        release_id: String,
        status_id: String,
    },

    #[error("no verified release for repository {0}")]
    NoVerifiedRelease(String),

    #[error("no verified releases found")]
    NoVerifiedReleases,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("release {release_id} was modified concurrently; gave up after {attempts} attempts")]
    Conflict { release_id: String, attempts: u32 },

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl ReviewError {
    /// Whether the error means the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ReleaseNotFound(_) | Self::StatusNotFound { .. } | Self::NoVerifiedRelease(_)
        )
    }
}

impl From<StorageError> for ReviewError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ReleaseNotFound { release_id } => Self::ReleaseNotFound(release_id),
            StorageError::VersionConflict { release_id, .. } => Self::Conflict {
                release_id,
                attempts: 1,
            },
            other => Self::Storage(other),
        }
    }
}

/// Result type for review operations.
pub type Result<T> = std::result::Result<T, ReviewError>;
