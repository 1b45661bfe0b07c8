use serde::{Deserialize, Serialize};

use super::{
    night::{ActionKind, NightAction},
    player::PlayerId,
};
use crate::error::GameError;

/// Player input, decoded once at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Start,
    NightAction(NightAction),
    Vote { target_id: PlayerId },
    Abort,
}

/// What a menu of choices is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    Kill,
    Save,
    Investigate,
    Vote,
}

impl ChoiceKind {
    /// Prefix of the choice ids handed out with a menu, e.g. `kill_<player>`.
    pub fn prefix(self) -> &'static str {
        match self {
            ChoiceKind::Kill => "kill",
            ChoiceKind::Save => "save",
            ChoiceKind::Investigate => "check",
            ChoiceKind::Vote => "vote",
        }
    }

    pub fn choice_id(self, target_id: &str) -> String {
        format!("{}_{}", self.prefix(), target_id)
    }
}

impl From<ActionKind> for ChoiceKind {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Kill => ChoiceKind::Kill,
            ActionKind::Save => ChoiceKind::Save,
            ActionKind::Investigate => ChoiceKind::Investigate,
        }
    }
}

impl Command {
    /// Decodes a button/menu choice id such as `join`, `kill_42` or `vote_7`.
    pub fn from_choice_id(choice_id: &str) -> Result<Self, GameError> {
        let invalid = || GameError::InvalidChoice(choice_id.to_string());
        match choice_id {
            "join" => return Ok(Command::Join),
            "start" => return Ok(Command::Start),
            "abort" => return Ok(Command::Abort),
            _ => {}
        }

        let (prefix, target) = choice_id.split_once('_').ok_or_else(invalid)?;
        if target.is_empty() {
            return Err(invalid());
        }
        let target_id = target.to_string();
        let kind = match prefix {
            "kill" => ActionKind::Kill,
            "save" => ActionKind::Save,
            "check" => ActionKind::Investigate,
            "vote" => return Ok(Command::Vote { target_id }),
            _ => return Err(invalid()),
        };
        Ok(Command::NightAction(NightAction { kind, target_id }))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Join => "join",
            Command::Start => "start",
            Command::NightAction(_) => "night_action",
            Command::Vote { .. } => "vote",
            Command::Abort => "abort",
        }
    }
}

/// Reply to the player who issued a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Joined { player_count: usize },
    Started { player_count: usize },
    ActionRecorded,
    Investigation { target_id: PlayerId, is_mafia: bool },
    VoteRecorded,
    Aborted,
}
