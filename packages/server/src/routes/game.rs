use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GameError;
use crate::models::{
    command::Command,
    night::{NightAction, NightActionRequest},
    player::PlayerId,
    vote::VoteRequest,
};
use crate::state::AppState;
use crate::utils::websocket;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub room_id: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChoiceRequest {
    pub player_id: PlayerId,
    pub choice_id: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // curl http://localhost:8080/api/game/rooms
        .route("/rooms", get(list_rooms))
        .nest(
            "/:roomid",
            Router::new()
                // curl -X POST http://localhost:8080/api/game/{roomid}/create/{hostid}
                .route("/create/:playerid", post(create_game))
                .route("/join/:playerid", post(join_game))
                .route("/start/:playerid", post(start_game))
                .route("/abort/:playerid", post(abort_game))
                .route("/state", get(get_game_state))
                .nest(
                    "/actions",
                    Router::new()
                        .route("/night-action", post(night_action_handler))
                        .route("/vote", post(cast_vote_handler))
                        .route("/choice", post(choice_handler)),
                )
                // websocat ws://localhost:8080/api/game/{roomid}/ws?player_id={playerid}
                .route("/ws", get(websocket::handler)),
        )
        .with_state(state)
}

fn status_for(error: &GameError) -> StatusCode {
    match error {
        GameError::UnknownSession(_) => StatusCode::NOT_FOUND,
        GameError::Unauthorized(_) => StatusCode::FORBIDDEN,
        GameError::InvalidState { .. }
        | GameError::DuplicateAction(_)
        | GameError::DuplicateVote(_)
        | GameError::DuplicatePlayer(_)
        | GameError::SessionAlreadyActive(_) => StatusCode::CONFLICT,
        GameError::InvalidTarget(_)
        | GameError::InsufficientPlayers { .. }
        | GameError::InvalidChoice(_) => StatusCode::BAD_REQUEST,
    }
}

pub(crate) fn reply<T: Serialize>(result: Result<T, GameError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            debug!("request rejected: {}", e);
            (
                status_for(&e),
                Json(ErrorResponse {
                    success: false,
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn list_rooms(State(state): State<AppState>) -> Response {
    reply(Ok::<_, GameError>(state.registry.rooms().await))
}

async fn create_game(
    State(state): State<AppState>,
    Path((room_id, host_id)): Path<(String, String)>,
) -> Response {
    let created = state
        .registry
        .create(&room_id, &host_id)
        .await
        .map(|handle| CreatedResponse {
            room_id: handle.room_id,
            session_id: handle.session_id.to_string(),
        });
    reply(created)
}

async fn join_game(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
    Query(params): Query<JoinParams>,
) -> Response {
    let result = state
        .registry
        .dispatch(&room_id, &player_id, Command::Join)
        .await;
    if result.is_ok() {
        if let Some(name) = params.name.filter(|n| !n.trim().is_empty()) {
            state.display_names.set(&room_id, &player_id, name.trim()).await;
        }
    }
    reply(result)
}

async fn start_game(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> Response {
    reply(
        state
            .registry
            .dispatch(&room_id, &player_id, Command::Start)
            .await,
    )
}

async fn abort_game(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> Response {
    reply(
        state
            .registry
            .dispatch(&room_id, &player_id, Command::Abort)
            .await,
    )
}

async fn get_game_state(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Response {
    reply(state.registry.snapshot(&room_id).await)
}

async fn night_action_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<NightActionRequest>,
) -> Response {
    let command = Command::NightAction(NightAction {
        kind: request.kind,
        target_id: request.target_id,
    });
    reply(
        state
            .registry
            .dispatch(&room_id, &request.player_id, command)
            .await,
    )
}

async fn cast_vote_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<VoteRequest>,
) -> Response {
    let command = Command::Vote {
        target_id: request.target_id,
    };
    reply(
        state
            .registry
            .dispatch(&room_id, &request.voter_id, command)
            .await,
    )
}

async fn choice_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<ChoiceRequest>,
) -> Response {
    let result = match Command::from_choice_id(&request.choice_id) {
        Ok(command) => {
            state
                .registry
                .dispatch(&room_id, &request.player_id, command)
                .await
        }
        Err(e) => Err(e),
    };
    reply(result)
}
