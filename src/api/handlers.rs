//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ChatSnapshotResponse, ErrorResponse, PersonaResponse,
    PresetsResponse, QuickCommandsResponse, ViewPayload,
};
use super::AppState;
use crate::auth::AuthState;
use crate::persona::PersonaDefinition;
use crate::runtime::{ChatKind, SessionError, SessionHandle};
use crate::state_machine::TransitionError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Auth boundary
        .route("/api/auth", get(get_auth))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        // Views
        .route("/api/view", get(get_view).post(set_view))
        // Persona setup
        .route("/api/persona", get(get_persona).put(update_persona))
        .route("/api/persona/presets", get(list_presets))
        .route("/api/persona/presets/:index", post(load_preset))
        .route("/api/role-play/start", post(start_role_play))
        .route("/api/quick-commands", get(quick_commands))
        // Chat sessions
        .route("/api/chat/:mode", get(get_chat))
        .route("/api/chat/:mode/messages", post(send_chat))
        .route("/api/chat/:mode/stream", get(stream_chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

fn require_user(state: &AppState) -> Result<(), AppError> {
    if state.auth.current().is_signed_in() {
        Ok(())
    } else {
        Err(SessionError::NotSignedIn.into())
    }
}

fn parse_mode(mode: &str) -> Result<ChatKind, AppError> {
    mode.parse().map_err(AppError::BadRequest)
}

// ============================================================
// Auth
// ============================================================

async fn get_auth(State(state): State<AppState>) -> Json<AuthState> {
    Json(state.auth.current())
}

async fn login(State(state): State<AppState>) -> Json<AuthState> {
    state.auth.login().await;
    Json(state.auth.current())
}

async fn logout(State(state): State<AppState>) -> Json<AuthState> {
    state.auth.logout().await;
    state.sessions.close_all().await;
    Json(state.auth.current())
}

// ============================================================
// Views
// ============================================================

async fn get_view(State(state): State<AppState>) -> Result<Json<ViewPayload>, AppError> {
    require_user(&state)?;
    Ok(Json(ViewPayload {
        view: state.sessions.view().await,
    }))
}

async fn set_view(
    State(state): State<AppState>,
    Json(req): Json<ViewPayload>,
) -> Result<Json<ViewPayload>, AppError> {
    require_user(&state)?;
    state.sessions.set_view(req.view).await;
    Ok(Json(req))
}

// ============================================================
// Persona Setup
// ============================================================

async fn get_persona(State(state): State<AppState>) -> Result<Json<PersonaResponse>, AppError> {
    require_user(&state)?;
    Ok(Json(state.sessions.persona().into()))
}

async fn update_persona(
    State(state): State<AppState>,
    Json(persona): Json<PersonaDefinition>,
) -> Result<Json<PersonaResponse>, AppError> {
    require_user(&state)?;
    state.sessions.update_persona(persona.clone());
    Ok(Json(persona.into()))
}

async fn list_presets(State(state): State<AppState>) -> Result<Json<PresetsResponse>, AppError> {
    require_user(&state)?;
    Ok(Json(PresetsResponse {
        presets: state.sessions.presets(),
    }))
}

async fn load_preset(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<PersonaResponse>, AppError> {
    require_user(&state)?;
    let persona = state.sessions.load_preset(index)?;
    Ok(Json(persona.into()))
}

async fn start_role_play(
    State(state): State<AppState>,
) -> Result<Json<ChatSnapshotResponse>, AppError> {
    require_user(&state)?;
    let handle = state.sessions.start_role_play().await?;
    Ok(Json(snapshot_response(&handle)))
}

async fn quick_commands(
    State(state): State<AppState>,
) -> Result<Json<QuickCommandsResponse>, AppError> {
    require_user(&state)?;
    Ok(Json(QuickCommandsResponse {
        commands: state.sessions.locale().quick_commands(),
    }))
}

// ============================================================
// Chat Sessions
// ============================================================

fn snapshot_response(handle: &SessionHandle) -> ChatSnapshotResponse {
    ChatSnapshotResponse::new(handle, handle.snapshot())
}

async fn get_chat(
    State(state): State<AppState>,
    Path(mode): Path<String>,
) -> Result<Json<ChatSnapshotResponse>, AppError> {
    require_user(&state)?;
    let handle = state.sessions.session(parse_mode(&mode)?).await?;
    Ok(Json(snapshot_response(&handle)))
}

async fn send_chat(
    State(state): State<AppState>,
    Path(mode): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_user(&state)?;
    let handle = state.sessions.session(parse_mode(&mode)?).await?;
    handle.submit(req.text).await?;
    Ok((StatusCode::ACCEPTED, Json(ChatResponse { accepted: true })))
}

async fn stream_chat(
    State(state): State<AppState>,
    Path(mode): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_user(&state)?;
    let handle = state.sessions.session(parse_mode(&mode)?).await?;

    // Subscribe before reading the snapshot so no event falls in between
    let broadcast_rx = handle.subscribe();
    Ok(sse_stream(snapshot_response(&handle), broadcast_rx))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("rolechat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::NotSignedIn => AppError::Unauthorized(message),
            SessionError::PersonaNotReady(_)
            | SessionError::Rejected(TransitionError::EmptyInput) => {
                AppError::Unprocessable(message)
            }
            SessionError::NoRolePlaySession | SessionError::UnknownPreset(_) => {
                AppError::NotFound(message)
            }
            SessionError::Closed | SessionError::Rejected(TransitionError::Busy) => {
                AppError::Conflict(message)
            }
            SessionError::Rejected(TransitionError::InvalidTransition(_)) => {
                AppError::Internal(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
