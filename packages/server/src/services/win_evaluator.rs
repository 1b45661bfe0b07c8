use std::collections::HashMap;

use crate::models::{
    player::PlayerId,
    role::{Faction, RoleType},
};

/// Decides whether the game is over given who is still alive.
///
/// Town wins once no Mafia is left; Mafia wins as soon as they are at least
/// as many as everybody else.
pub fn evaluate(alive: &[PlayerId], roles: &HashMap<PlayerId, RoleType>) -> Option<Faction> {
    let mafia_alive = alive
        .iter()
        .filter(|p| roles.get(*p).map(|role| role.faction()) == Some(Faction::Mafia))
        .count();
    let others_alive = alive.len() - mafia_alive;

    if mafia_alive == 0 {
        Some(Faction::Town)
    } else if mafia_alive >= others_alive {
        Some(Faction::Mafia)
    } else {
        None
    }
}
