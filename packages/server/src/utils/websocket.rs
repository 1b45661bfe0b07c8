use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tracing::{info, warn};

use crate::error::GameError;
use crate::models::{command::Command, player::PlayerId};
use crate::services::broadcast::RoomNotification;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SocketParams {
    pub player_id: Option<PlayerId>,
}

/// A menu choice sent by a client, e.g. `{"choice_id": "vote_p3"}`.
#[derive(Debug, Serialize, Deserialize)]
struct ClientChoice {
    choice_id: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<SocketParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(rx) = room_subscription(&state, &room_id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": GameError::UnknownSession(room_id).to_string(),
            })),
        )
            .into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, params.player_id, rx))
}

/// Subscribes to the room's channel, only while the room has a session.
pub async fn room_subscription(
    state: &AppState,
    room_id: &str,
) -> Option<broadcast::Receiver<String>> {
    if !state.registry.contains(room_id).await {
        return None;
    }
    Some(state.channels.get_or_create(room_id).await.subscribe())
}

/// Whether a room frame should reach the socket of `player_id`.
fn is_visible_to(text: &str, player_id: Option<&str>) -> bool {
    match serde_json::from_str::<RoomNotification>(text) {
        Ok(frame) => match frame.target_player_id.as_deref() {
            None => true,
            Some(target) => Some(target) == player_id,
        },
        Err(_) => false,
    }
}

pub async fn handle_socket(
    ws: WebSocket,
    state: AppState,
    room_id: String,
    player_id: Option<PlayerId>,
    mut rx: broadcast::Receiver<String>,
) {
    info!("New WebSocket connection established for room: {}", room_id);
    let (mut sender, mut receiver) = ws.split();
    // replies meant only for this socket
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<String>();

    let viewer = player_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                frame = rx.recv() => match frame {
                    Ok(text) if is_visible_to(&text, viewer.as_deref()) => text,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("socket lagged behind by {} messages", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                direct = direct_rx.recv() => match direct {
                    Some(text) => text,
                    None => break,
                },
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                warn!("Error sending message: {}", e);
                break;
            }
        }
    });

    let room_for_receive = room_id.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else { continue };
            let Some(actor) = player_id.as_deref() else {
                let _ = direct_tx.send(
                    serde_json::json!({ "success": false, "error": "player_id is required to play" })
                        .to_string(),
                );
                continue;
            };

            let result = match serde_json::from_str::<ClientChoice>(&text) {
                Ok(choice) => match Command::from_choice_id(&choice.choice_id) {
                    Ok(command) => state
                        .registry
                        .dispatch(&room_for_receive, actor, command)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                },
                Err(e) => Err(format!("malformed message: {}", e)),
            };

            let response = match result {
                Ok(outcome) => serde_json::json!({ "success": true, "result": outcome }),
                Err(error) => serde_json::json!({ "success": false, "error": error }),
            };
            if direct_tx.send(response.to_string()).is_err() {
                break;
            }
        }
    });

    let _ = tokio::join!(receive_task, send_task);
    info!("WebSocket connection closed for room: {}", room_id);
}
