//! HTTP endpoints
//!
//! REST API for session lifecycle, the text-chat surface, and document
//! classification.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bima_core::Language;
use bima_docscan::{classify_identity_text, ScanOutcome};

use crate::metrics::{metrics_handler, record_request, record_round_trip};
use crate::state::AppState;
use crate::websocket::ws_handler;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = {
        let config = state.config.read();
        build_cors_layer(&config.server.cors_origins, config.server.cors_enabled)
    };

    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id", delete(delete_session))
        // Call controls (also reachable over the WebSocket)
        .route("/api/sessions/:id/call/start", post(start_call))
        .route("/api/sessions/:id/call/end", post(end_call))
        .route("/api/sessions/:id/mute", post(set_mute))
        .route("/api/sessions/:id/transcript", get(get_transcript))
        // Text chat surface
        .route("/api/chat/:id", post(chat))
        // Document scan classification (OCR runs client-side)
        .route("/api/documents/classify", post(classify_document))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        // Voice WebSocket
        .route("/ws/call/:id", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - cors disabled: permissive (development only)
/// - no origins configured: localhost fallback
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            },
        })
        .collect();

    if parsed.is_empty() {
        tracing::info!("No CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().expect("static origin"))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed.len());
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct CreateSessionRequest {
    /// "en" or "hi"; defaults to the configured call language
    language: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    session_id: String,
    language: Language,
}

async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<Json<CreateSessionResponse>, StatusCode> {
    record_request("create_session");
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let language = match request.language.as_deref() {
        Some(code) => Some(
            Language::from_code(code)
                .ok_or(StatusCode::BAD_REQUEST)?,
        ),
        None => None,
    };

    let settings = state.settings();
    let entry = state
        .sessions
        .create(&settings, language)
        .map_err(StatusCode::from)?;

    Ok(Json(CreateSessionResponse {
        session_id: entry.session.id().to_string(),
        language: entry.session.language(),
    }))
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    record_request("list_sessions");
    let ids = state.sessions.ids();
    Json(serde_json::json!({
        "sessions": ids,
        "count": ids.len(),
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    record_request("get_session");
    let entry = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = entry.session.snapshot();
    Ok(Json(serde_json::json!({
        "session_id": id,
        "language": entry.session.language(),
        "created_at": entry.created_at,
        "call": snapshot,
    })))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    record_request("delete_session");
    if state.sessions.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn start_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    record_request("start_call");
    let entry = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    entry.session.start_call();
    Ok(Json(serde_json::json!({ "call": entry.session.snapshot() })))
}

async fn end_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    record_request("end_call");
    let entry = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    entry.session.end_call();
    Ok(Json(serde_json::json!({ "call": entry.session.snapshot() })))
}

#[derive(Debug, Deserialize)]
struct MuteRequest {
    muted: bool,
}

async fn set_mute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MuteRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    record_request("set_mute");
    let entry = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    entry.session.toggle_mute(request.muted);
    Ok(Json(serde_json::json!({ "call": entry.session.snapshot() })))
}

async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    record_request("get_transcript");
    let entry = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let turns = entry.session.turns();
    Ok(Json(serde_json::json!({
        "turns": turns,
        "count": turns.len(),
    })))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
    turn_count: usize,
}

#[derive(Debug, Serialize)]
struct ChatErrorResponse {
    error: String,
}

/// Text chat against the same conversation engine as the voice call
///
/// Failures come back as an inline, localized message: "no internet" for
/// connectivity problems, a generic retry message otherwise.
async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ChatErrorResponse>)> {
    record_request("chat");

    let entry = state.sessions.get(&id).ok_or((
        StatusCode::NOT_FOUND,
        Json(ChatErrorResponse {
            error: "unknown session".to_string(),
        }),
    ))?;

    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ChatErrorResponse {
                error: "empty message".to_string(),
            }),
        ));
    }

    let engine = entry.session.engine();
    let started = std::time::Instant::now();
    match engine.reply(&request.message).await {
        Ok(turn) => {
            record_round_trip("chat_completion", started.elapsed().as_secs_f64());
            Ok(Json(ChatResponse {
                reply: turn.text,
                turn_count: engine.turn_count(),
            }))
        },
        Err(e) => {
            tracing::warn!(session = %id, error = %e, "chat completion failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ChatErrorResponse {
                    error: e.user_message(entry.session.language()).to_string(),
                }),
            ))
        },
    }
}

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    /// OCR-extracted text from the client-side scanner
    text: String,
}

async fn classify_document(
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ScanOutcome>, StatusCode> {
    record_request("classify_document");
    if request.text.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(classify_identity_text(&request.text)))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ready": true,
        "sessions": state.sessions.len(),
    }))
}
