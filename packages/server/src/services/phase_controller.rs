use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::GameError;
use crate::models::{
    command::{ChoiceKind, Command, CommandOutcome},
    config::GameConfig,
    event::GameEvent,
    game::{GamePhase, GameSession, SessionSnapshot},
    night::ActionKind,
    player::PlayerId,
    role::Faction,
};
use crate::services::{
    platform::{ChoiceAudience, Delivery, Outbox, PlatformAdapter},
    role_assigner::RandomSource,
    session_registry::SessionRegistry,
};

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Everything a session reacts to, in arrival order.
#[derive(Debug)]
pub(crate) enum SessionMessage {
    Command {
        actor: PlayerId,
        command: Command,
        reply: Reply<Result<CommandOutcome, GameError>>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
    Timeout(u64),
    /// Admin abort, no host check.
    Shutdown {
        reply: Option<Reply<()>>,
    },
}

/// One-shot phase timer. Arming it again, cancelling it or dropping it
/// aborts the pending expiry.
pub struct PhaseTimer {
    inbox: mpsc::WeakUnboundedSender<SessionMessage>,
    pending: Option<JoinHandle<()>>,
    epoch: u64,
}

impl PhaseTimer {
    pub(crate) fn new(inbox: mpsc::WeakUnboundedSender<SessionMessage>) -> Self {
        Self {
            inbox,
            pending: None,
            epoch: 0,
        }
    }

    /// Schedules `Timeout(token)` after `duration` and returns the token.
    pub(crate) fn arm(&mut self, duration: Duration) -> u64 {
        self.cancel();
        self.epoch += 1;
        let token = self.epoch;
        let inbox = self.inbox.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(SessionMessage::Timeout(token));
            }
        }));
        token
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Accepts the expiry only if `token` belongs to the currently armed
    /// timer, so each phase resolves exactly once.
    pub(crate) fn take_expiry(&mut self, token: u64) -> bool {
        if self.pending.is_some() && token == self.epoch {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn deadline_after(duration: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Drives one room's game: applies commands and timer expiries one at a time
/// and tells the platform about every transition.
pub struct PhaseController {
    session_id: Uuid,
    session: GameSession,
    config: Arc<GameConfig>,
    rng: Box<dyn RandomSource + Send>,
    timer: PhaseTimer,
    outbox: Outbox,
    registry: SessionRegistry,
    inbox: mpsc::UnboundedReceiver<SessionMessage>,
}

impl PhaseController {
    /// Spawns the controller task and returns the sender feeding it.
    pub(crate) fn spawn(
        session_id: Uuid,
        session: GameSession,
        config: Arc<GameConfig>,
        rng: Box<dyn RandomSource + Send>,
        adapter: Arc<dyn PlatformAdapter>,
        registry: SessionRegistry,
    ) -> mpsc::UnboundedSender<SessionMessage> {
        let (tx, inbox) = mpsc::unbounded_channel();
        let outbox = Outbox::spawn(session.room_id().to_string(), adapter);
        let controller = PhaseController {
            session_id,
            rng,
            timer: PhaseTimer::new(tx.downgrade()),
            session,
            config,
            outbox,
            registry,
            inbox,
        };
        tokio::spawn(controller.run());
        tx
    }

    async fn run(mut self) {
        info!(room_id = %self.session.room_id(), session_id = %self.session_id, "session opened");
        let mut shutdown_replies = Vec::new();
        while let Some(message) = self.inbox.recv().await {
            match message {
                SessionMessage::Command {
                    actor,
                    command,
                    reply,
                } => {
                    let name = command.name();
                    let result = self.handle_command(&actor, command);
                    if let Err(e) = &result {
                        debug!(room_id = %self.session.room_id(), command = name, "rejected command from {}: {}", actor, e);
                    }
                    let _ = reply.send(result);
                }
                SessionMessage::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
                SessionMessage::Timeout(token) => self.handle_timeout(token),
                SessionMessage::Shutdown { reply } => {
                    self.abort();
                    shutdown_replies.extend(reply);
                }
            }

            if self.session.phase() == GamePhase::Ended {
                break;
            }
        }

        let PhaseController {
            session_id,
            session,
            mut timer,
            outbox,
            registry,
            ..
        } = self;
        timer.cancel();
        // Pending deliveries go out before the room's platform state is released.
        outbox.close().await;
        registry.remove_instance(session.room_id(), session_id).await;
        for reply in shutdown_replies {
            let _ = reply.send(());
        }
        info!(room_id = %session.room_id(), session_id = %session_id, "session closed");
    }

    fn handle_command(
        &mut self,
        actor: &str,
        command: Command,
    ) -> Result<CommandOutcome, GameError> {
        match command {
            Command::Join => {
                let player_count = self.session.join(actor)?;
                debug!(room_id = %self.session.room_id(), "{} joined ({} players)", actor, player_count);
                Ok(CommandOutcome::Joined { player_count })
            }
            Command::Start => {
                self.session.start(actor, self.rng.as_mut())?;
                self.on_started();
                Ok(CommandOutcome::Started {
                    player_count: self.session.players().len(),
                })
            }
            Command::NightAction(action) => {
                let outcome = self.session.submit_action(actor, action)?;
                if let CommandOutcome::Investigation {
                    target_id,
                    is_mafia,
                } = &outcome
                {
                    self.outbox.push(Delivery::Investigation {
                        detective_id: actor.to_string(),
                        target_id: target_id.clone(),
                        is_mafia: *is_mafia,
                    });
                }
                Ok(outcome)
            }
            Command::Vote { target_id } => {
                self.session.cast_vote(actor, &target_id)?;
                Ok(CommandOutcome::VoteRecorded)
            }
            Command::Abort => {
                if actor != self.session.host_id() {
                    return Err(GameError::Unauthorized(actor.to_string()));
                }
                self.abort();
                Ok(CommandOutcome::Aborted)
            }
        }
    }

    fn on_started(&mut self) {
        info!(
            room_id = %self.session.room_id(),
            players = self.session.players().len(),
            "game started"
        );
        self.outbox.announce(GameEvent::GameStarted {
            players: self.session.players().to_vec(),
        });
        for player in self.session.players() {
            if let Some(role) = self.session.role_of(player) {
                self.outbox.private(player, format!("Your role: {}", role));
            }
        }
        self.on_night_opened();
    }

    fn on_night_opened(&mut self) {
        self.outbox.push(Delivery::Cleanup);
        let deadline = deadline_after(self.config.night_duration);
        self.outbox.announce(GameEvent::NightWindowOpened {
            round: self.session.round(),
            alive: self.session.alive().to_vec(),
            deadline,
        });
        for player in self.session.alive() {
            let Some(kind) = self.session.role_of(player).and_then(ActionKind::for_role) else {
                continue;
            };
            self.outbox.push(Delivery::Choices {
                audience: ChoiceAudience::Player(player.clone()),
                candidates: self.session.night_candidates(player),
                kind: kind.into(),
            });
        }
        self.timer.arm(self.config.night_duration);
        info!(room_id = %self.session.room_id(), round = self.session.round(), "night opened");
    }

    fn on_day_opened(&mut self) {
        self.outbox.push(Delivery::Cleanup);
        let deadline = deadline_after(self.config.day_duration);
        self.outbox.announce(GameEvent::DayWindowOpened {
            round: self.session.round(),
            alive: self.session.alive().to_vec(),
            deadline,
        });
        self.outbox.push(Delivery::Choices {
            audience: ChoiceAudience::Room(self.session.room_id().to_string()),
            candidates: self.session.alive().to_vec(),
            kind: ChoiceKind::Vote,
        });
        self.timer.arm(self.config.day_duration);
        info!(room_id = %self.session.room_id(), round = self.session.round(), "day opened");
    }

    fn handle_timeout(&mut self, token: u64) {
        if !self.timer.take_expiry(token) {
            debug!(room_id = %self.session.room_id(), token, "ignoring stale timeout");
            return;
        }

        let round = self.session.round();
        let result = match self.session.phase() {
            GamePhase::Night => self.session.resolve_night().map(|outcome| {
                info!(room_id = %self.session.room_id(), round, deaths = ?outcome.deaths, "night resolved");
                self.outbox.announce(GameEvent::NightResolved {
                    round,
                    deaths: outcome.deaths,
                });
                self.after_resolution(outcome.winner);
            }),
            GamePhase::NightResolved => self.session.open_day().map(|_| self.on_day_opened()),
            GamePhase::Day => self.session.resolve_day().map(|outcome| {
                info!(room_id = %self.session.room_id(), round, eliminated = ?outcome.eliminated, "day resolved");
                let (eliminated, revealed_role) = match outcome.eliminated {
                    Some((player, role)) => (Some(player), Some(role)),
                    None => (None, None),
                };
                self.outbox.announce(GameEvent::DayResolved {
                    round,
                    eliminated,
                    revealed_role,
                });
                self.after_resolution(outcome.winner);
            }),
            GamePhase::DayResolved => self.session.open_night().map(|_| self.on_night_opened()),
            GamePhase::Lobby | GamePhase::Ended => Err(GameError::InvalidState {
                operation: "timeout",
                phase: self.session.phase(),
            }),
        };

        if let Err(e) = result {
            warn!(room_id = %self.session.room_id(), "timer fired in an unexpected state: {}", e);
        }
    }

    fn after_resolution(&mut self, winner: Option<Faction>) {
        match winner {
            Some(faction) => {
                self.timer.cancel();
                info!(room_id = %self.session.room_id(), winner = %faction, "game over");
                self.outbox.announce(GameEvent::GameEnded {
                    winner: Some(faction),
                });
            }
            None => {
                self.timer.arm(self.config.reveal_delay);
            }
        }
    }

    fn abort(&mut self) {
        if self.session.phase() == GamePhase::Ended {
            return;
        }
        self.timer.cancel();
        self.session.abort();
        warn!(room_id = %self.session.room_id(), "session aborted");
        self.outbox.announce(GameEvent::GameEnded { winner: None });
    }
}
