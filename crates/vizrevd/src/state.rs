use std::sync::Arc;

use vizrev_core::{ReleaseReview, ReleaseStore, RepositoryStore, RepositorySync};

/// Shared state for the axum routes.
#[derive(Clone, Debug)]
pub struct AppState {
    pub review: ReleaseReview,
    pub sync: RepositorySync,
}

impl AppState {
    pub fn new(
        releases: Arc<dyn ReleaseStore>,
        repositories: Arc<dyn RepositoryStore>,
        max_update_attempts: u32,
    ) -> Self {
        Self {
            review: ReleaseReview::new(releases.clone()).with_max_attempts(max_update_attempts),
            sync: RepositorySync::new(releases, repositories),
        }
    }
}
