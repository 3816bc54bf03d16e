//! HTTP error mapping.
//!
//! Failures are reported in the response envelope: `message` says what the
//! route was doing, `error` carries the underlying cause.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};
use vizrev_core::ReviewError;

use crate::response::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A workflow operation failed. `context` is the route's failure message.
    #[error("{context}")]
    Review {
        context: &'static str,
        #[source]
        source: ReviewError,
    },

    #[error("Invalid request body.")]
    InvalidBody(#[from] JsonRejection),

    #[error("Not found")]
    RouteNotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Review { source, .. } => match source {
                ReviewError::ReleaseNotFound(_)
                | ReviewError::StatusNotFound { .. }
                | ReviewError::NoVerifiedRelease(_) => StatusCode::NOT_FOUND,
                ReviewError::Validation(_) | ReviewError::NoVerifiedReleases => {
                    StatusCode::BAD_REQUEST
                }
                ReviewError::Conflict { .. } => StatusCode::CONFLICT,
                ReviewError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Review { source, context } => match source {
                ReviewError::ReleaseNotFound(_) => "Release not found.".to_string(),
                ReviewError::StatusNotFound { .. } => "Status not found.".to_string(),
                ReviewError::NoVerifiedRelease(_) | ReviewError::NoVerifiedReleases => {
                    "No verified releases found.".to_string()
                }
                _ => context.to_string(),
            },
            other => other.to_string(),
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Review { source, .. } => source.to_string(),
            ApiError::InvalidBody(rejection) => rejection.body_text(),
            ApiError::RouteNotFound => "Not found".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.detail(), "{}", self);
        } else if status == StatusCode::CONFLICT {
            warn!(error = %self.detail(), "{}", self);
        }

        let body = Envelope::<()>::failure(self.message(), self.detail());
        (status, body).into_response()
    }
}

/// Attach a route's failure message to a workflow result.
pub trait ApiContext<T> {
    fn api_context(self, context: &'static str) -> Result<T, ApiError>;
}

impl<T> ApiContext<T> for Result<T, ReviewError> {
    fn api_context(self, context: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::Review { context, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizrev_state::StorageError;

    fn review(source: ReviewError) -> ApiError {
        ApiError::Review {
            context: "Failed to update status.",
            source,
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            review(ReviewError::ReleaseNotFound("r".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            review(ReviewError::NoVerifiedReleases).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            review(ReviewError::Conflict {
                release_id: "r".into(),
                attempts: 3
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            review(ReviewError::Storage(StorageError::Backend("down".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_messages_name_the_resource() {
        let err = review(ReviewError::StatusNotFound {
            release_id: "r".into(),
            status_id: "s".into(),
        });
        assert_eq!(err.message(), "Status not found.");
        assert!(err.detail().contains("s"));
    }

    #[test]
    fn test_server_errors_use_route_message() {
        let err = review(ReviewError::Storage(StorageError::Backend("down".into())));
        assert_eq!(err.message(), "Failed to update status.");
        assert!(err.detail().contains("down"));
    }
}
