//! vizrevd: HTTP surface for the vizrev release review workflow.
//!
//! The binary wires SurrealDB-backed stores into [`AppState`]; tests build
//! the same [`router`] over the in-memory fakes.

pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

use response::ApiResponse;

#[derive(Debug, Serialize)]
struct Health {
    version: &'static str,
}

async fn health() -> ApiResponse<Health> {
    ApiResponse::ok(
        "ok",
        Health {
            version: vizrev_core::VERSION,
        },
    )
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// The full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", routes::api_routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
