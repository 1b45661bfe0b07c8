use serde::{Deserialize, Serialize};

use super::role::RoleType;

/// Opaque platform user id.
pub type PlayerId = String;

/// Public view of one seat at the table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub is_alive: bool,
    /// Only set once the role is public: after elimination or after the game ends.
    pub revealed_role: Option<RoleType>,
}
