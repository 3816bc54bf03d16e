//! Reviewer submissions: new verification entries and patches to existing ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vizrev_state::{ReleaseId, StatusId, VerificationEntry};

use crate::domain::error::{Result, ReviewError};

/// Payload for a new verification entry.
///
/// Everything except `reviewerID` may be omitted; omitted fields take the
/// entry defaults (not reviewed, not safe, no comment, dated now).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStatus {
    #[serde(rename = "releaseID", default)]
    pub release_id: Option<String>,
    #[serde(rename = "reviewerID", default)]
    pub reviewer_id: String,
    #[serde(default)]
    pub is_reviewed: bool,
    #[serde(default)]
    pub is_safe: bool,
    #[serde(default)]
    pub additional_comments: String,
    #[serde(default)]
    pub review_date: Option<DateTime<Utc>>,
}

impl NewStatus {
    /// An empty assignment for `reviewer_id`.
    pub fn for_reviewer(reviewer_id: impl Into<String>) -> Self {
        Self {
            reviewer_id: reviewer_id.into(),
            ..Default::default()
        }
    }

    /// A submitted judgment for `reviewer_id`.
    pub fn judgment(reviewer_id: impl Into<String>, is_safe: bool) -> Self {
        Self {
            reviewer_id: reviewer_id.into(),
            is_reviewed: true,
            is_safe,
            ..Default::default()
        }
    }

    /// Validate and materialize the entry for `release_id`.
    pub fn into_entry(self, release_id: &ReleaseId) -> Result<VerificationEntry> {
        let reviewer_id = self.reviewer_id.trim().to_string();
        if reviewer_id.is_empty() {
            return Err(ReviewError::Validation("reviewerID is required".to_string()));
        }

        Ok(VerificationEntry {
            id: StatusId::new(),
            release_id: self
                .release_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| release_id.0.clone()),
            reviewer_id,
            is_reviewed: self.is_reviewed,
            is_safe: self.is_safe,
            additional_comments: self.additional_comments,
            review_date: self.review_date.unwrap_or_else(Utc::now),
        })
    }
}

/// Field-level merge onto an existing entry. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPatch {
    #[serde(default)]
    pub is_reviewed: Option<bool>,
    #[serde(default)]
    pub is_safe: Option<bool>,
    #[serde(default)]
    pub additional_comments: Option<String>,
    #[serde(default)]
    pub review_date: Option<DateTime<Utc>>,
}

impl StatusPatch {
    /// A reviewed judgment.
    pub fn reviewed(is_safe: bool) -> Self {
        Self {
            is_reviewed: Some(true),
            is_safe: Some(is_safe),
            ..Default::default()
        }
    }

    pub fn apply(&self, entry: &mut VerificationEntry) {
        if let Some(is_reviewed) = self.is_reviewed {
            entry.is_reviewed = is_reviewed;
        }
        if let Some(is_safe) = self.is_safe {
            entry.is_safe = is_safe;
        }
        if let Some(comments) = &self.additional_comments {
            entry.additional_comments = comments.clone();
        }
        if let Some(date) = self.review_date {
            entry.review_date = date;
        }
    }
}
