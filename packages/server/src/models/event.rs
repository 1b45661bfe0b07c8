use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    player::PlayerId,
    role::{Faction, RoleType},
};

/// Everything the engine tells the room about. Roles are never part of these;
/// they go to each player privately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        players: Vec<PlayerId>,
    },
    NightWindowOpened {
        round: u32,
        alive: Vec<PlayerId>,
        deadline: DateTime<Utc>,
    },
    NightResolved {
        round: u32,
        deaths: Vec<PlayerId>,
    },
    DayWindowOpened {
        round: u32,
        alive: Vec<PlayerId>,
        deadline: DateTime<Utc>,
    },
    DayResolved {
        round: u32,
        eliminated: Option<PlayerId>,
        revealed_role: Option<RoleType>,
    },
    /// `winner` is `None` when the host aborted the game.
    GameEnded {
        winner: Option<Faction>,
    },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::GameStarted { players } => {
                write!(f, "The game has started with {} players", players.len())
            }
            GameEvent::NightWindowOpened { round, .. } => write!(f, "Night {} falls", round),
            GameEvent::NightResolved { deaths, .. } if deaths.is_empty() => {
                write!(f, "A quiet night, nobody died")
            }
            GameEvent::NightResolved { deaths, .. } => {
                write!(f, "Killed during the night: {}", deaths.join(", "))
            }
            GameEvent::DayWindowOpened { round, .. } => {
                write!(f, "Day {}: vote for the suspect", round)
            }
            GameEvent::DayResolved {
                eliminated: Some(player),
                revealed_role: Some(role),
                ..
            } => write!(f, "{} was eliminated, they were {}", player, role),
            GameEvent::DayResolved { .. } => write!(f, "Nobody was eliminated"),
            GameEvent::GameEnded { winner: Some(faction) } => write!(f, "{} wins!", faction),
            GameEvent::GameEnded { winner: None } => write!(f, "The game was aborted"),
        }
    }
}
