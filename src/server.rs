//! HTTP surface: the chat page plus a small JSON API.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::catalog::Intent;
use crate::error::{ApiError, INTERNAL_ERROR_ANSWER};
use crate::pipeline::{AskOutcome, Assistant, NOT_UNDERSTOOD_MESSAGE};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub llm_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/ask", post(ask))
        .route("/api/health", get(health))
        .route("/api/intents", get(intents))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind HTTP server")?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received");
}

// Route handlers

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Internal(e.body_text()))?;

    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::EmptyQuestion);
    }

    match state.assistant.ask(question).await {
        AskOutcome::Answered(answer) => Ok(Json(answer).into_response()),
        AskOutcome::NotUnderstood => Ok(Json(json!({
            "answer": NOT_UNDERSTOOD_MESSAGE,
            "intent": Intent::Unknown,
            "query_executed": false,
        }))
        .into_response()),
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let connected = state.assistant.database_connected().await;
    Json(json!({
        "status": "healthy",
        "database": if connected { "connected" } else { "disconnected" },
        "llm": if state.llm_configured { "configured" } else { "not configured" },
    }))
}

async fn intents(State(state): State<AppState>) -> Json<Value> {
    let entries: Vec<Value> = state
        .assistant
        .catalog()
        .descriptors()
        .map(|d| {
            json!({
                "intent": d.intent,
                "name": d.name,
                "description": d.description,
            })
        })
        .collect();
    Json(Value::Array(entries))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {detail}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": ApiError::Internal(detail).to_string(),
            "answer": INTERNAL_ERROR_ANSWER,
        })),
    )
        .into_response()
}
