use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, Mutex};

use crate::error::PlatformError;
use crate::models::{command::ChoiceKind, event::GameEvent, player::PlayerId};
use crate::services::platform::{ChoiceAudience, MessageRef, PlatformAdapter};

/// JSON frame pushed to every socket subscribed to a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomNotification {
    pub message_type: String,
    pub message_id: String,
    pub room_id: String,
    /// Set for private results; only that player's socket forwards it.
    pub target_player_id: Option<PlayerId>,
    pub content: serde_json::Value,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Choice {
    choice_id: String,
    player_id: PlayerId,
    label: String,
}

/// Per-room broadcast channels shared by all sockets.
#[derive(Clone)]
pub struct RoomChannels {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
    capacity: usize,
}

impl RoomChannels {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    pub async fn get_or_create(&self, room_id: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(room_id) {
            channel.clone()
        } else {
            let (tx, _) = broadcast::channel(self.capacity);
            channels.insert(room_id.to_string(), tx.clone());
            tx
        }
    }

    /// Drops the room's sender. Subscribers drain what is buffered, then see
    /// the channel closed.
    pub async fn remove(&self, room_id: &str) {
        self.channels.lock().await.remove(room_id);
    }

    pub async fn len(&self) -> usize {
        self.channels.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Display names players registered when joining, per room.
#[derive(Clone, Default)]
pub struct DisplayNames {
    rooms: Arc<Mutex<HashMap<String, HashMap<PlayerId, String>>>>,
}

impl DisplayNames {
    pub async fn set(&self, room_id: &str, player_id: &str, name: &str) {
        self.rooms
            .lock()
            .await
            .entry(room_id.to_string())
            .or_default()
            .insert(player_id.to_string(), name.to_string());
    }

    pub async fn get(&self, room_id: &str, player_id: &str) -> Option<String> {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .and_then(|names| names.get(player_id))
            .cloned()
    }

    pub async fn remove_room(&self, room_id: &str) {
        self.rooms.lock().await.remove(room_id);
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

/// Adapter publishing everything as [`RoomNotification`]s on one room's channel.
pub struct BroadcastAdapter {
    room_id: String,
    channels: RoomChannels,
    names: DisplayNames,
}

impl BroadcastAdapter {
    pub fn new(room_id: &str, channels: RoomChannels, names: DisplayNames) -> Self {
        Self {
            room_id: room_id.to_string(),
            channels,
            names,
        }
    }

    async fn publish(
        &self,
        message_type: &str,
        target_player_id: Option<&str>,
        content: serde_json::Value,
    ) -> Result<MessageRef, PlatformError> {
        let notification = RoomNotification {
            message_type: message_type.to_string(),
            message_id: uuid::Uuid::new_v4().to_string(),
            room_id: self.room_id.clone(),
            target_player_id: target_player_id.map(str::to_string),
            content,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let text = serde_json::to_string(&notification)
            .map_err(|e| PlatformError::Delivery(e.to_string()))?;
        let tx = self.channels.get_or_create(&self.room_id).await;
        // No subscribers is not an error: nobody is watching right now.
        let _ = tx.send(text);
        Ok(MessageRef(notification.message_id))
    }

    async fn display_name(&self, player_id: &str) -> String {
        self.names
            .get(&self.room_id, player_id)
            .await
            .unwrap_or_else(|| player_id.to_string())
    }
}

#[async_trait]
impl PlatformAdapter for BroadcastAdapter {
    async fn send_message(&self, _room_id: &str, content: &str) -> Result<MessageRef, PlatformError> {
        self.publish("message", None, serde_json::Value::String(content.to_string()))
            .await
    }

    async fn send_private_result(&self, user_id: &str, content: &str) -> Result<(), PlatformError> {
        self.publish(
            "private",
            Some(user_id),
            serde_json::Value::String(content.to_string()),
        )
        .await
        .map(|_| ())
    }

    async fn present_choices(
        &self,
        audience: &ChoiceAudience,
        candidates: &[PlayerId],
        kind: ChoiceKind,
    ) -> Result<MessageRef, PlatformError> {
        let mut choices = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            choices.push(Choice {
                choice_id: kind.choice_id(candidate),
                player_id: candidate.clone(),
                label: self.display_name(candidate).await,
            });
        }
        let target = match audience {
            ChoiceAudience::Player(player_id) => Some(player_id.as_str()),
            ChoiceAudience::Room(_) => None,
        };
        self.publish(
            "choices",
            target,
            serde_json::json!({ "kind": kind, "choices": choices }),
        )
        .await
    }

    async fn resolve_display_name(&self, user_id: &str) -> Result<String, PlatformError> {
        Ok(self.display_name(user_id).await)
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), PlatformError> {
        self.publish("delete", None, serde_json::json!({ "message_id": message.0 }))
            .await
            .map(|_| ())
    }

    async fn announce(&self, _room_id: &str, event: &GameEvent) -> Result<MessageRef, PlatformError> {
        let content =
            serde_json::to_value(event).map_err(|e| PlatformError::Delivery(e.to_string()))?;
        self.publish("game_event", None, content).await
    }

    async fn close_room(&self, _room_id: &str) -> Result<(), PlatformError> {
        self.channels.remove(&self.room_id).await;
        self.names.remove_room(&self.room_id).await;
        Ok(())
    }
}
