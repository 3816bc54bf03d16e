//! Release submission payloads.

use serde::{Deserialize, Serialize};
use vizrev_state::{ReleasePatch, ReleaseRecord, RepositoryId};

use crate::domain::error::{Result, ReviewError};
use crate::domain::verification::NewStatus;

/// A release submitted for review, optionally with reviewer assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelease {
    #[serde(rename = "repositoryID", default)]
    pub repository_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "codesandbox_URL", default)]
    pub codesandbox_url: String,
    #[serde(default)]
    pub statuses: Vec<NewStatus>,
}

impl NewRelease {
    pub fn new(repository_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Assign reviewers with empty judgments.
    pub fn with_reviewers<I, S>(mut self, reviewers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses
            .extend(reviewers.into_iter().map(NewStatus::for_reviewer));
        self
    }

    /// Validate and build the release document.
    pub fn into_record(self) -> Result<ReleaseRecord> {
        if self.repository_id.trim().is_empty() {
            return Err(ReviewError::Validation("repositoryID is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ReviewError::Validation("name is required".to_string()));
        }

        let mut record = ReleaseRecord::new(RepositoryId(self.repository_id), self.name);
        record.description = self.description;
        record.codesandbox_url = self.codesandbox_url;
        record.statuses = self
            .statuses
            .into_iter()
            .map(|status| status.into_entry(&record.id))
            .collect::<Result<Vec<_>>>()?;
        Ok(record)
    }
}

/// Reject patches that would blank the release name.
pub fn validate_patch(patch: &ReleasePatch) -> Result<()> {
    match &patch.name {
        Some(name) if name.trim().is_empty() => {
            Err(ReviewError::Validation("name must not be empty".to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_release_builds_assignments() {
        let record = NewRelease::new("repo-1", "v1.0.0")
            .with_reviewers(["alice", "bob"])
            .into_record()
            .unwrap();

        assert_eq!(record.repository_id, RepositoryId::from("repo-1"));
        assert!(!record.verified);
        assert_eq!(record.version, 0);
        assert_eq!(record.statuses.len(), 2);
        assert!(record
            .statuses
            .iter()
            .all(|s| s.release_id == record.id.0 && !s.is_reviewed));
    }

    #[test]
    fn test_new_release_requires_repository_and_name() {
        assert!(matches!(
            NewRelease::new("", "v1").into_record(),
            Err(ReviewError::Validation(_))
        ));
        assert!(matches!(
            NewRelease::new("repo", " ").into_record(),
            Err(ReviewError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_name_patch_rejected() {
        let patch = ReleasePatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_err());
        assert!(validate_patch(&ReleasePatch::default()).is_ok());
    }
}
