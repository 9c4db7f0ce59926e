//! Routes driving the calculator session.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use hushcalc_engine::application::session::SessionView;
use hushcalc_minigames::MiniGameInput;
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /press.
#[derive(Debug, Deserialize)]
pub struct PressRequest {
    /// Button label, e.g. `"7"`, `"+"` or `"="`.
    pub label: String,
}

/// Request body for POST /mute.
#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    /// Whether the calculator should be muted.
    pub muted: bool,
}

/// GET /
#[instrument(skip(state))]
async fn get_session(State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.session.view().await?))
}

/// POST /press
#[instrument(skip(state))]
async fn press(
    State(state): State<AppState>,
    Json(request): Json<PressRequest>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.session.press(request.label).await?))
}

/// POST /mute
#[instrument(skip(state))]
async fn mute(
    State(state): State<AppState>,
    Json(request): Json<MuteRequest>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.session.set_muted(request.muted).await?))
}

/// POST /mini-game
#[instrument(skip(state))]
async fn mini_game(
    State(state): State<AppState>,
    Json(input): Json<MiniGameInput>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.session.mini_game_input(input).await?))
}

/// POST /reset
#[instrument(skip(state))]
async fn reset(State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.session.reset().await?))
}

/// POST /restart
#[instrument(skip(state))]
async fn restart(State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.session.restart().await?))
}

/// Returns the router for the session.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_session))
        .route("/press", post(press))
        .route("/mute", post(mute))
        .route("/mini-game", post(mini_game))
        .route("/reset", post(reset))
        .route("/restart", post(restart))
}
