use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{player::PlayerId, role::RoleType};
use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Kill,
    Save,
    Investigate,
}

impl ActionKind {
    /// The one role allowed to perform this action.
    pub fn role(self) -> RoleType {
        match self {
            ActionKind::Kill => RoleType::Mafia,
            ActionKind::Save => RoleType::Doctor,
            ActionKind::Investigate => RoleType::Detective,
        }
    }

    pub fn for_role(role: RoleType) -> Option<Self> {
        match role {
            RoleType::Mafia => Some(ActionKind::Kill),
            RoleType::Doctor => Some(ActionKind::Save),
            RoleType::Detective => Some(ActionKind::Investigate),
            RoleType::Citizen => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightAction {
    pub kind: ActionKind,
    pub target_id: PlayerId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NightActionRequest {
    pub player_id: PlayerId,
    pub kind: ActionKind,
    pub target_id: PlayerId,
}

/// Secret actions collected during one night.
///
/// `acted` holds every player who already used their action tonight.
/// The kill and save targets are single slots: a later submission from a
/// second Mafia member replaces the first one instead of being tallied.
#[derive(Debug, Clone, Default)]
pub struct NightActions {
    acted: HashSet<PlayerId>,
    pending_kill: Option<PlayerId>,
    pending_save: Option<PlayerId>,
}

impl NightActions {
    pub fn has_acted(&self, player_id: &str) -> bool {
        self.acted.contains(player_id)
    }

    pub fn len(&self) -> usize {
        self.acted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acted.is_empty()
    }

    pub fn pending_kill(&self) -> Option<&PlayerId> {
        self.pending_kill.as_ref()
    }

    pub fn pending_save(&self) -> Option<&PlayerId> {
        self.pending_save.as_ref()
    }

    pub fn record(&mut self, player_id: &str, action: NightAction) -> Result<(), GameError> {
        if self.has_acted(player_id) {
            return Err(GameError::DuplicateAction(player_id.to_string()));
        }
        match action.kind {
            ActionKind::Kill => self.pending_kill = Some(action.target_id),
            ActionKind::Save => self.pending_save = Some(action.target_id),
            ActionKind::Investigate => {}
        }
        self.acted.insert(player_id.to_string());
        Ok(())
    }

    /// The player who dies tonight: the kill target, unless the doctor saved them.
    pub fn casualty(&self) -> Option<&PlayerId> {
        match (&self.pending_kill, &self.pending_save) {
            (Some(kill), Some(save)) if kill == save => None,
            (Some(kill), _) => Some(kill),
            (None, _) => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
