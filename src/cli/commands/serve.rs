//! HTTP API server for the course assistant.
//!
//! Provides REST endpoints for course questions and catalog statistics.

use super::build_system;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use crate::tools::Source;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    system: RagSystem,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let system = build_system(&settings).await?;
    let app = router(Arc::new(AppState { system }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Syllabus API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<Source>,
    session_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "query must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    // Unknown or evicted ids get a fresh session instead of a made-up one.
    let sessions = state.system.sessions();
    let session_id = match req.session_id {
        Some(id) if sessions.contains(&id) => id,
        _ => sessions.create_session(),
    };
    let response = state.system.query(&req.query, Some(&session_id)).await;

    Json(QueryResponse {
        answer: response.answer,
        sources: response.sources,
        session_id,
    })
    .into_response()
}

async fn courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.system.course_analytics().await {
        Ok(analytics) => Json(analytics).into_response(),
        Err(e) => {
            warn!("Course analytics failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
