use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::PlatformError;
use crate::models::{command::ChoiceKind, event::GameEvent, player::PlayerId};

/// Handle to a message the platform sent, kept so it can be deleted later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub String);

/// Who gets to see a menu of choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ChoiceAudience {
    Player(PlayerId),
    Room(String),
}

/// Everything the engine needs from the chat platform.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    async fn send_message(&self, room_id: &str, content: &str)
        -> Result<MessageRef, PlatformError>;

    async fn send_private_result(&self, user_id: &str, content: &str)
        -> Result<(), PlatformError>;

    async fn present_choices(
        &self,
        audience: &ChoiceAudience,
        candidates: &[PlayerId],
        kind: ChoiceKind,
    ) -> Result<MessageRef, PlatformError>;

    async fn resolve_display_name(&self, user_id: &str) -> Result<String, PlatformError>;

    async fn delete_message(&self, message: &MessageRef) -> Result<(), PlatformError>;

    async fn announce(&self, room_id: &str, event: &GameEvent) -> Result<MessageRef, PlatformError> {
        self.send_message(room_id, &event.to_string()).await
    }

    /// Called once after the room's session has ended and its last message
    /// went out. Releases whatever the adapter keeps for the room.
    async fn close_room(&self, _room_id: &str) -> Result<(), PlatformError> {
        Ok(())
    }
}

/// Builds the adapter for a newly created session.
pub type AdapterFactory = Arc<dyn Fn(&str) -> Arc<dyn PlatformAdapter> + Send + Sync>;

#[derive(Debug)]
pub(crate) enum Delivery {
    Announce(GameEvent),
    Private {
        user_id: PlayerId,
        content: String,
    },
    Investigation {
        detective_id: PlayerId,
        target_id: PlayerId,
        is_mafia: bool,
    },
    Choices {
        audience: ChoiceAudience,
        candidates: Vec<PlayerId>,
        kind: ChoiceKind,
    },
    /// Delete everything sent since the previous cleanup.
    Cleanup,
    /// Last delivery of a session.
    Close,
}

/// Queue of adapter calls for one session.
///
/// The session never awaits the platform: deliveries run in order on their own
/// task, and a failed delivery is logged and skipped.
pub(crate) struct Outbox {
    tx: mpsc::UnboundedSender<Delivery>,
    task: JoinHandle<()>,
}

impl Outbox {
    pub(crate) fn spawn(room_id: String, adapter: Arc<dyn PlatformAdapter>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(deliver(room_id, adapter, rx));
        Outbox { tx, task }
    }

    /// Flushes what is queued, lets the adapter release the room and waits
    /// for the delivery task to finish.
    pub(crate) async fn close(self) {
        self.push(Delivery::Close);
        let Outbox { tx, task } = self;
        drop(tx);
        if let Err(e) = task.await {
            warn!("delivery task failed: {}", e);
        }
    }

    pub(crate) fn push(&self, delivery: Delivery) {
        if self.tx.send(delivery).is_err() {
            warn!("delivery task has stopped, dropping message");
        }
    }

    pub(crate) fn announce(&self, event: GameEvent) {
        self.push(Delivery::Announce(event));
    }

    pub(crate) fn private(&self, user_id: &str, content: String) {
        self.push(Delivery::Private {
            user_id: user_id.to_string(),
            content,
        });
    }
}

async fn deliver(
    room_id: String,
    adapter: Arc<dyn PlatformAdapter>,
    mut rx: mpsc::UnboundedReceiver<Delivery>,
) {
    let mut sent: Vec<MessageRef> = Vec::new();
    while let Some(delivery) = rx.recv().await {
        match delivery {
            Delivery::Announce(event) => match adapter.announce(&room_id, &event).await {
                Ok(message) => sent.push(message),
                Err(e) => warn!(room_id = %room_id, "failed to announce {:?}: {}", event, e),
            },
            Delivery::Private { user_id, content } => {
                if let Err(e) = adapter.send_private_result(&user_id, &content).await {
                    warn!(room_id = %room_id, "failed to reach player {}: {}", user_id, e);
                }
            }
            Delivery::Investigation {
                detective_id,
                target_id,
                is_mafia,
            } => {
                let name = adapter
                    .resolve_display_name(&target_id)
                    .await
                    .unwrap_or_else(|_| target_id.clone());
                let verdict = if is_mafia { "a member of the Mafia" } else { "innocent" };
                let content = format!("Investigation result: {} is {}", name, verdict);
                if let Err(e) = adapter.send_private_result(&detective_id, &content).await {
                    warn!(room_id = %room_id, "failed to reach detective {}: {}", detective_id, e);
                }
            }
            Delivery::Choices {
                audience,
                candidates,
                kind,
            } => match adapter.present_choices(&audience, &candidates, kind).await {
                Ok(message) => sent.push(message),
                Err(e) => warn!(room_id = %room_id, "failed to present {:?} choices: {}", kind, e),
            },
            Delivery::Cleanup => {
                for message in sent.drain(..) {
                    if let Err(e) = adapter.delete_message(&message).await {
                        warn!(room_id = %room_id, "failed to delete {:?}: {}", message, e);
                    }
                }
            }
            Delivery::Close => {
                if let Err(e) = adapter.close_room(&room_id).await {
                    warn!(room_id = %room_id, "failed to release room: {}", e);
                }
                break;
            }
        }
    }
}
