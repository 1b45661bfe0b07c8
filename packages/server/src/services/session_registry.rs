use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::info;
use uuid::Uuid;

use crate::error::GameError;
use crate::models::{
    command::{Command, CommandOutcome},
    config::GameConfig,
    game::{GameSession, SessionSnapshot},
};
use crate::services::{
    phase_controller::{PhaseController, SessionMessage},
    platform::AdapterFactory,
    role_assigner::{RandomSource, SeededRandom},
};

/// Builds the random source each new session shuffles roles with.
pub type RandomFactory = Arc<dyn Fn() -> Box<dyn RandomSource + Send> + Send + Sync>;

/// Sender side of a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub room_id: String,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, message: SessionMessage) -> Result<(), GameError> {
        self.tx
            .send(message)
            .map_err(|_| GameError::UnknownSession(self.room_id.clone()))
    }
}

/// Room id → active session. At most one session per room.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
    config: Arc<GameConfig>,
    adapters: AdapterFactory,
    random: RandomFactory,
}

impl SessionRegistry {
    pub fn new(config: Arc<GameConfig>, adapters: AdapterFactory) -> Self {
        let seed = config.role_seed;
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            config,
            adapters,
            random: Arc::new(move || Box::new(SeededRandom::new(seed)) as Box<dyn RandomSource + Send>),
        }
    }

    /// Replaces the role shuffling source for sessions created from now on.
    pub fn with_random_source(mut self, random: RandomFactory) -> Self {
        self.random = random;
        self
    }

    /// Opens a lobby for `room_id` hosted by `host_id`.
    pub async fn create(&self, room_id: &str, host_id: &str) -> Result<SessionHandle, GameError> {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(room_id)
            .is_some_and(|handle| handle.is_running())
        {
            return Err(GameError::SessionAlreadyActive(room_id.to_string()));
        }

        let session_id = Uuid::new_v4();
        let adapter = (self.adapters)(room_id);
        let tx = PhaseController::spawn(
            session_id,
            GameSession::new(room_id, host_id),
            self.config.clone(),
            (self.random)(),
            adapter,
            self.clone(),
        );
        let handle = SessionHandle {
            session_id,
            room_id: room_id.to_string(),
            tx,
        };
        sessions.insert(room_id.to_string(), handle.clone());
        info!(room_id, host_id, %session_id, "session created");
        Ok(handle)
    }

    async fn handle(&self, room_id: &str) -> Result<SessionHandle, GameError> {
        self.sessions
            .lock()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| GameError::UnknownSession(room_id.to_string()))
    }

    /// Hands `command` to the room's session and waits for its verdict.
    pub async fn dispatch(
        &self,
        room_id: &str,
        actor: &str,
        command: Command,
    ) -> Result<CommandOutcome, GameError> {
        let handle = self.handle(room_id).await?;
        let (reply, rx) = oneshot::channel();
        handle.send(SessionMessage::Command {
            actor: actor.to_string(),
            command,
            reply,
        })?;
        rx.await
            .map_err(|_| GameError::UnknownSession(room_id.to_string()))?
    }

    pub async fn snapshot(&self, room_id: &str) -> Result<SessionSnapshot, GameError> {
        let handle = self.handle(room_id).await?;
        let (reply, rx) = oneshot::channel();
        handle.send(SessionMessage::Snapshot { reply })?;
        rx.await
            .map_err(|_| GameError::UnknownSession(room_id.to_string()))
    }

    /// Admin abort: cancels the session's timer and removes it, host or not.
    /// Returns once the session has released the room.
    pub async fn abort(&self, room_id: &str) -> Result<(), GameError> {
        let handle = self.handle(room_id).await?;
        let (reply, rx) = oneshot::channel();
        // The session may have ended on its own in the meantime.
        if handle
            .send(SessionMessage::Shutdown { reply: Some(reply) })
            .is_ok()
        {
            let _ = rx.await;
        }
        self.remove_instance(room_id, handle.session_id).await;
        Ok(())
    }

    /// Aborts every session, e.g. on process shutdown.
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = self.sessions.lock().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.send(SessionMessage::Shutdown { reply: None });
        }
    }

    pub async fn contains(&self, room_id: &str) -> bool {
        self.sessions.lock().await.contains_key(room_id)
    }

    pub async fn rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        rooms.sort();
        rooms
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes `room_id` only if it still maps to `session_id`.
    pub(crate) async fn remove_instance(&self, room_id: &str, session_id: Uuid) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(room_id)
            .is_some_and(|handle| handle.session_id == session_id)
        {
            sessions.remove(room_id);
        }
    }
}
