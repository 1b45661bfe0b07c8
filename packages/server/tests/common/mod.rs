#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use server::{
    error::PlatformError,
    models::{command::ChoiceKind, event::GameEvent, player::PlayerId},
    services::{
        platform::{ChoiceAudience, MessageRef, PlatformAdapter},
        role_assigner::RandomSource,
        session_registry::SessionRegistry,
    },
    utils::test_setup::test_config,
};

/// Keeps the seating order, so P1 is Mafia, P2 Doctor, P3 Detective.
pub struct Identity;

impl RandomSource for Identity {
    fn next_index(&mut self, upper: usize) -> usize {
        upper - 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Message(MessageRef, String),
    Private { user_id: PlayerId, content: String },
    Choices {
        message: MessageRef,
        audience: ChoiceAudience,
        candidates: Vec<PlayerId>,
        kind: ChoiceKind,
    },
    Deleted(MessageRef),
    Event(MessageRef, GameEvent),
}

/// Adapter that remembers every call instead of talking to a platform.
#[derive(Default)]
pub struct RecordingAdapter {
    calls: Mutex<Vec<Call>>,
    counter: AtomicUsize,
}

impl RecordingAdapter {
    fn next_ref(&self) -> MessageRef {
        MessageRef(format!("m{}", self.counter.fetch_add(1, Ordering::SeqCst)))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Event(_, event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn private_messages(&self, user_id: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Private { user_id: to, content } if to == user_id => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Deleted(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl PlatformAdapter for RecordingAdapter {
    async fn send_message(&self, _room_id: &str, content: &str) -> Result<MessageRef, PlatformError> {
        let message = self.next_ref();
        self.record(Call::Message(message.clone(), content.to_string()));
        Ok(message)
    }

    async fn send_private_result(&self, user_id: &str, content: &str) -> Result<(), PlatformError> {
        self.record(Call::Private {
            user_id: user_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn present_choices(
        &self,
        audience: &ChoiceAudience,
        candidates: &[PlayerId],
        kind: ChoiceKind,
    ) -> Result<MessageRef, PlatformError> {
        let message = self.next_ref();
        self.record(Call::Choices {
            message: message.clone(),
            audience: audience.clone(),
            candidates: candidates.to_vec(),
            kind,
        });
        Ok(message)
    }

    async fn resolve_display_name(&self, user_id: &str) -> Result<String, PlatformError> {
        Ok(format!("name-of-{}", user_id))
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), PlatformError> {
        self.record(Call::Deleted(message.clone()));
        Ok(())
    }

    async fn announce(&self, _room_id: &str, event: &GameEvent) -> Result<MessageRef, PlatformError> {
        let message = self.next_ref();
        self.record(Call::Event(message.clone(), event.clone()));
        Ok(message)
    }
}

/// Adapter whose every call fails, to check the game does not care.
pub struct BrokenAdapter;

#[async_trait]
impl PlatformAdapter for BrokenAdapter {
    async fn send_message(&self, _room_id: &str, _content: &str) -> Result<MessageRef, PlatformError> {
        Err(PlatformError::Closed)
    }

    async fn send_private_result(&self, _user_id: &str, _content: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Delivery("unreachable".to_string()))
    }

    async fn present_choices(
        &self,
        _audience: &ChoiceAudience,
        _candidates: &[PlayerId],
        _kind: ChoiceKind,
    ) -> Result<MessageRef, PlatformError> {
        Err(PlatformError::Closed)
    }

    async fn resolve_display_name(&self, user_id: &str) -> Result<String, PlatformError> {
        Err(PlatformError::UnknownMessage(user_id.to_string()))
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), PlatformError> {
        Err(PlatformError::UnknownMessage(message.0.clone()))
    }
}

pub fn registry_with(adapter: Arc<dyn PlatformAdapter>) -> SessionRegistry {
    SessionRegistry::new(
        Arc::new(test_config()),
        Arc::new(move |_room_id: &str| adapter.clone()),
    )
    .with_random_source(Arc::new(|| Box::new(Identity) as Box<dyn RandomSource + Send>))
}

pub fn recording_registry() -> (SessionRegistry, Arc<RecordingAdapter>) {
    let recorder = Arc::new(RecordingAdapter::default());
    (registry_with(recorder.clone()), recorder)
}
