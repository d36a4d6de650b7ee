// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event API (§6 "Event API exposed to UI subscribers"): HTTP routes for
//! session lifecycle operations plus a WebSocket endpoint streaming the
//! orchestrator-wide event bus as JSON. Rendering a terminal from this
//! stream is the UI's job, not this crate's (spec Non-goals).

use std::sync::Arc;

use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::extract::ws::{Message, WebSocket};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::{ErrorCode, SupervisorError};
use crate::orchestrator::{Orchestrator, SessionSummary};
use crate::session::WorktreeGitContext;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub auth_token: Option<String>,
}

fn error_status(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::AlreadyExists => StatusCode::CONFLICT,
        ErrorCode::SpawnFailed => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::Exited => StatusCode::CONFLICT,
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for SupervisorError {
    fn into_response(self) -> Response {
        let body = ErrorBody { code: self.code.as_str(), message: self.message };
        (error_status(self.code), Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize, Default)]
struct AttachRequest {
    #[serde(default)]
    branch: String,
    #[serde(default)]
    git_root: String,
    #[serde(default)]
    base_branch: Option<String>,
}

impl From<AttachRequest> for WorktreeGitContext {
    fn from(req: AttachRequest) -> Self {
        Self { branch: req.branch, git_root: req.git_root, base_branch: req.base_branch }
    }
}

#[derive(Debug, Deserialize)]
struct InputRequest {
    /// Raw bytes as a UTF-8 string; `consumed` in the response tells the
    /// caller whether this was the reserved return-to-menu shortcut.
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct InputResponse {
    consumed: bool,
}

#[derive(Debug, Deserialize)]
struct ResizeRequest {
    cols: u16,
    rows: u16,
}

async fn health() -> &'static str {
    "ok"
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummary>> {
    Json(state.orchestrator.list().await)
}

async fn attach_session(
    State(state): State<Arc<AppState>>,
    Path((project, worktree)): Path<(String, String)>,
    body: Option<Json<AttachRequest>>,
) -> Result<Json<SessionSummary>, SupervisorError> {
    let git_context = body.map(|Json(req)| req.into()).unwrap_or_default();
    let session = state.orchestrator.attach(&project, &worktree, git_context).await?;
    Ok(Json(SessionSummary {
        id: session.id,
        project: session.project.clone(),
        worktree: session.worktree.clone(),
        state: session.current_state(),
        is_attached: session.is_attached(),
        has_background_task: session.has_background_task(),
    }))
}

async fn detach_session(
    State(state): State<Arc<AppState>>,
    Path((project, worktree)): Path<(String, String)>,
) -> Result<StatusCode, SupervisorError> {
    state.orchestrator.detach(&project, &worktree).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_input(
    State(state): State<Arc<AppState>>,
    Path((project, worktree)): Path<(String, String)>,
    Json(req): Json<InputRequest>,
) -> Result<Json<InputResponse>, SupervisorError> {
    let consumed = state.orchestrator.send_input(&project, &worktree, Bytes::from(req.text.into_bytes())).await?;
    Ok(Json(InputResponse { consumed }))
}

async fn resize_session(
    State(state): State<Arc<AppState>>,
    Path((project, worktree)): Path<(String, String)>,
    Json(req): Json<ResizeRequest>,
) -> Result<StatusCode, SupervisorError> {
    state.orchestrator.resize(&project, &worktree, req.cols, req.rows).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn destroy_session(
    State(state): State<Arc<AppState>>,
    Path((project, worktree)): Path<(String, String)>,
) -> StatusCode {
    if state.orchestrator.destroy(&project, &worktree).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Upgrade to a WebSocket streaming every event on the orchestrator's bus
/// (§4.9) as a JSON line per event, newest events last.
async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Some(ref expected) = state.auth_token {
        if query.token.as_deref() != Some(expected.as_str()) {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }
    ws.on_upgrade(move |socket| stream_events(state, socket)).into_response()
}

async fn stream_events(state: Arc<AppState>, socket: WebSocket) {
    let subscription = state.orchestrator.subscribe();
    let (mut sink, mut source) = socket.split();

    // Drain client-to-server frames only to notice disconnects; the Event
    // API is subscribe-only (§6), input flows through the HTTP routes.
    let drain = tokio::spawn(async move { while source.next().await.is_some() {} });

    loop {
        let event = subscription.recv().await;
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("event serialization failed: {e}");
                continue;
            }
        };
        if sink.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }

    drain.abort();
}

/// Bearer-token middleware; skips `/api/v1/health` and WebSocket upgrades
/// (the WS handler authenticates via query token instead).
async fn auth_layer(State(state): State<Arc<AppState>>, req: Request<axum::body::Body>, next: Next) -> Response {
    let path = req.uri().path();
    if path == "/api/v1/health" || path == "/ws" {
        return next.run(req).await;
    }

    let Some(ref expected) = state.auth_token else {
        return next.run(req).await;
    };

    let authorized = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected);

    if authorized {
        next.run(req).await
    } else {
        let body = ErrorBody { code: "UNAUTHORIZED", message: "unauthorized".to_string() };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Health-only router for a dedicated probe port (§6 ambient config),
/// separate from the main Event API so a liveness probe never competes with
/// `auth_layer` or the WebSocket upgrade path.
pub fn build_health_router() -> Router {
    Router::new().route("/healthz", get(health))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/sessions", get(list_sessions))
        .route(
            "/api/v1/sessions/{project}/{worktree}",
            post(attach_session).delete(destroy_session),
        )
        .route("/api/v1/sessions/{project}/{worktree}/detach", post(detach_session))
        .route("/api/v1/sessions/{project}/{worktree}/input", post(send_input))
        .route("/api/v1/sessions/{project}/{worktree}/resize", post(resize_session))
        .route("/ws", get(ws_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
