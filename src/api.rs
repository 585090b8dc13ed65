//! Read-only observation HTTP surface for the dashboard. §4.9.
//!
//! No mutation routes: this engine is driven by the CLI (or an embedding
//! process), and the API only ever reads the on-disk state back out. That
//! is a deliberate scope cut from the teacher's injection API, which is
//! authenticated and accepts writes -- see `DESIGN.md`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::EngineConfig;
use crate::peek::{self, PeekEntry};
use crate::persistence;
use crate::state::{self, Snapshot};

#[derive(Clone)]
pub struct AppState {
    pub state_path: PathBuf,
    pub agents_root: Option<PathBuf>,
    pub config: Arc<EngineConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    total_updates: u64,
}

/// GET /health
async fn health(State(app): State<AppState>) -> Json<HealthResponse> {
    let stored = persistence::load(&app.state_path, app.config.half_life_hours);
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        total_updates: stored.meta.total_updates,
    })
}

/// GET /state
async fn get_state(State(app): State<AppState>) -> Result<Json<Snapshot>, StatusCode> {
    let stored = persistence::load(&app.state_path, app.config.half_life_hours);
    let snapshot = state::observe_at(&stored, Utc::now());
    Ok(Json(snapshot))
}

/// GET /agents/:id/peek
async fn peek_agent(
    State(app): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Vec<PeekEntry>>, (StatusCode, String)> {
    let Some(agents_root) = &app.agents_root else {
        return Err((
            StatusCode::NOT_IMPLEMENTED,
            "multi-agent peek is not configured for this deployment".to_string(),
        ));
    };
    let peeked = peek::peek_siblings(agents_root, &id, app.config.peek_limit);
    Ok(Json(peeked))
}

/// Build the read-only observation router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(get_state))
        .route("/agents/{id}/peek", get(peek_agent))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            state_path: PathBuf::from("/tmp/emotion-engine-api-test-does-not-exist.json"),
            agents_root: None,
            config: Arc::new(EngineConfig::default()),
        }
    }

    #[tokio::test]
    async fn health_returns_200() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn state_returns_200_even_with_no_state_file() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn peek_without_agents_root_is_not_implemented() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/agents/some-id/peek")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
