use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleType {
    Mafia,
    Doctor,
    Detective,
    Citizen,
}

/// The two competing sides. Town is everybody who is not Mafia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Mafia,
    Town,
}

impl RoleType {
    pub fn faction(self) -> Faction {
        match self {
            RoleType::Mafia => Faction::Mafia,
            RoleType::Doctor | RoleType::Detective | RoleType::Citizen => Faction::Town,
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleType::Mafia => write!(f, "Mafia"),
            RoleType::Doctor => write!(f, "Doctor"),
            RoleType::Detective => write!(f, "Detective"),
            RoleType::Citizen => write!(f, "Citizen"),
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Mafia => write!(f, "Mafia"),
            Faction::Town => write!(f, "Town"),
        }
    }
}
