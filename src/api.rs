//! HTTP endpoints.
//!
//! The session token travels in the `X-Game-Token` header on HTTP and in
//! the `token` query parameter on the socket upgrade.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::error::GameError;
use crate::protocol::{CommandEnvelope, GameCommand, JoinRequest};
use crate::state::AppState;
use crate::ws;

pub const TOKEN_HEADER: &str = "X-Game-Token";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/join_room", post(join_room))
        .route("/game_command", post(game_command))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// POST /join_room
///
/// Creates the room if needed. A previous session token in the header lets
/// a player back into a room that already started.
pub async fn join_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<JoinRequest>,
) -> Response {
    match state.join_room(request, session_token(&headers)).await {
        Ok(joined) => Json(joined).into_response(),
        Err(e) => {
            tracing::info!("Join refused: {}", e);
            e.into_response()
        }
    }
}

/// POST /game_command
pub async fn game_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(envelope): Json<CommandEnvelope>,
) -> Response {
    let Some(token) = session_token(&headers) else {
        return GameError::InvalidToken.into_response();
    };
    let command = match GameCommand::try_from(envelope) {
        Ok(command) => command,
        Err(e) => return e.into_response(),
    };

    match state.execute(token, command).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
