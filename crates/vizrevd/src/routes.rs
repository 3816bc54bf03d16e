//! REST routes for the release review workflow, mounted under `/api`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;
use vizrev_core::{
    NewRelease, NewStatus, ReleaseId, ReleasePatch, ReleaseRecord, RepositoryId, StatusId,
    StatusPatch, StatusUpdate, SyncReport,
};

use crate::error::{ApiContext, ApiError};
use crate::response::ApiResponse;
use crate::state::AppState;

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// Build the `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/releases/{id}/statuses", post(append_status))
        .route("/release", post(create_release).get(list_releases))
        .route("/release/latest/{repository_id}", get(latest_verified))
        .route(
            "/release/repository/{repository_id}",
            get(list_repository_releases),
        )
        .route(
            "/release/{id}",
            get(get_release).put(update_release).delete(delete_release),
        )
        .route("/release/{id}/status", post(push_status))
        .route("/release/{id}/status/{status_id}", put(update_status))
        .route("/release/{id}/{reviewer_id}/status", get(find_status))
        .route("/repository/verify", post(verify_repositories))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusLookup {
    status_id: StatusId,
}

// ── Release management ───────────────────────────────────────────────────────

/// POST /api/release
async fn create_release(
    State(state): State<AppState>,
    body: Result<Json<NewRelease>, JsonRejection>,
) -> ApiResult<ReleaseRecord> {
    let Json(new_release) = body?;
    let release = state
        .review
        .create_release(new_release)
        .await
        .api_context("Failed to create release.")?;
    Ok(ApiResponse::created("Release created successfully.", release))
}

/// GET /api/release
async fn list_releases(State(state): State<AppState>) -> ApiResult<Vec<ReleaseRecord>> {
    let releases = state
        .review
        .list_releases(None)
        .await
        .api_context("Failed to retrieve releases.")?;
    Ok(ApiResponse::ok("Releases retrieved successfully.", releases))
}

/// GET /api/release/repository/{repository_id}
async fn list_repository_releases(
    State(state): State<AppState>,
    Path(repository_id): Path<String>,
) -> ApiResult<Vec<ReleaseRecord>> {
    let releases = state
        .review
        .list_releases(Some(&RepositoryId(repository_id)))
        .await
        .api_context("Failed to retrieve releases for repository.")?;
    Ok(ApiResponse::ok("Releases retrieved successfully.", releases))
}

/// GET /api/release/{id}
async fn get_release(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReleaseRecord> {
    let release = state
        .review
        .get_release(&ReleaseId(id))
        .await
        .api_context("Failed to retrieve release.")?;
    Ok(ApiResponse::ok("Release retrieved successfully.", release))
}

/// PUT /api/release/{id}: descriptive fields only.
async fn update_release(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReleasePatch>, JsonRejection>,
) -> ApiResult<ReleaseRecord> {
    let Json(patch) = body?;
    let release = state
        .review
        .update_release(&ReleaseId(id), patch)
        .await
        .api_context("Failed to update release.")?;
    Ok(ApiResponse::ok("Release updated successfully.", release))
}

/// DELETE /api/release/{id}
async fn delete_release(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state
        .review
        .delete_release(&ReleaseId(id))
        .await
        .api_context("Failed to delete release.")?;
    Ok(ApiResponse::notice("Release deleted successfully."))
}

// ── Verification ─────────────────────────────────────────────────────────────

/// POST /api/releases/{id}/statuses: load, append, save.
async fn append_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<NewStatus>, JsonRejection>,
) -> ApiResult<ReleaseRecord> {
    let Json(status) = body?;
    let release = state
        .review
        .append_status(&ReleaseId(id), status)
        .await
        .api_context("Failed to add status.")?;
    Ok(ApiResponse::ok("Status added to release.", release))
}

/// POST /api/release/{id}/status: atomic append.
async fn push_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<NewStatus>, JsonRejection>,
) -> ApiResult<ReleaseRecord> {
    let Json(status) = body?;
    let release = state
        .review
        .push_status(&ReleaseId(id), status)
        .await
        .api_context("Failed to add status.")?;
    Ok(ApiResponse::ok("Status added to release.", release))
}

/// GET /api/release/{id}/{reviewer_id}/status
async fn find_status(
    State(state): State<AppState>,
    Path((id, reviewer_id)): Path<(String, String)>,
) -> ApiResult<StatusLookup> {
    let status_id = state
        .review
        .find_status_by_reviewer(&ReleaseId(id), &reviewer_id)
        .await
        .api_context("Failed to retrieve status.")?;
    Ok(ApiResponse::ok(
        "Status retrieved successfully.",
        StatusLookup { status_id },
    ))
}

/// PUT /api/release/{id}/status/{status_id}: patch and evaluate.
async fn update_status(
    State(state): State<AppState>,
    Path((id, status_id)): Path<(String, String)>,
    body: Result<Json<StatusPatch>, JsonRejection>,
) -> ApiResult<ReleaseRecord> {
    let Json(patch) = body?;
    let outcome = state
        .review
        .update_status_and_evaluate(&ReleaseId(id), &StatusId(status_id), patch)
        .await
        .api_context("Failed to update status.")?;

    Ok(match outcome {
        StatusUpdate::Updated(release) => {
            ApiResponse::ok("Status updated and verification evaluated.", release)
        }
        StatusUpdate::Deleted { release_id } => {
            debug!(release_id = %release_id, "Release removed by majority rejection");
            ApiResponse::notice("Release deleted due to majority rejection.")
        }
    })
}

/// GET /api/release/latest/{repository_id}
async fn latest_verified(
    State(state): State<AppState>,
    Path(repository_id): Path<String>,
) -> ApiResult<ReleaseRecord> {
    let release = state
        .review
        .latest_verified(&RepositoryId(repository_id))
        .await
        .api_context("Failed to retrieve latest verified release.")?;
    Ok(ApiResponse::ok("Latest verified release retrieved.", release))
}

/// POST /api/repository/verify
async fn verify_repositories(State(state): State<AppState>) -> ApiResult<SyncReport> {
    let report = state
        .sync
        .verify_repositories_from_releases()
        .await
        .api_context("Failed to verify repositories")?;
    Ok(ApiResponse::ok("Repositories verified successfully", report))
}
