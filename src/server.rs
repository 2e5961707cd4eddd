/// JSON API over the Q&A pipeline.
///
/// Thin adapter: every route maps onto `Pipeline::ask` or the index admin
/// surface; no pipeline logic lives here.
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::backend::azure::AzureSearchClient;
use crate::pipeline::{AnswerResult, Pipeline};

pub struct AppState {
    pub pipeline: Pipeline,
    pub search: Arc<AzureSearchClient>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ask", post(ask))
        .route("/api/stats", get(stats))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "docqa",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResult>, (StatusCode, Json<Value>)> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Question is required", "answer": null})),
        ));
    }

    info!("Web request - Question: {question:.50}...");
    Ok(Json(state.pipeline.ask(question).await))
}

async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.search.document_count().await {
        Ok(count) => Ok(Json(json!({
            "document_count": count,
            "index_name": state.search.index_name(),
        }))),
        Err(e) => {
            error!("Error getting document count: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            ))
        }
    }
}
