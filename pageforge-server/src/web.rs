//! HTTP surface.
//!
//!   GET  /              → liveness
//!   POST /api-endpoint  → run a build
//!   POST /evaluation    → mock evaluator, echoes the body back

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::BuildError;
use crate::orchestrator::Orchestrator;

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api-endpoint", post(build))
        .route("/evaluation", post(evaluation))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true, "message": "LLM Deployment API is live" }))
}

async fn build(
    State(orchestrator): State<Arc<Orchestrator>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return BuildError::Validation(format!("Invalid request body: {}", rejection.body_text()))
                .into_response();
        }
    };

    match orchestrator.run(body).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome.response)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn evaluation(body: Result<Json<serde_json::Value>, JsonRejection>) -> Response {
    match body {
        Ok(Json(received)) => {
            tracing::info!(%received, "evaluation received");
            Json(serde_json::json!({ "ok": true, "received": received })).into_response()
        }
        Err(rejection) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": rejection.body_text() })),
        )
            .into_response(),
    }
}
