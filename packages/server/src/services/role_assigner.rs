use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;

use crate::error::GameError;
use crate::models::{player::PlayerId, role::RoleType};

pub const MIN_PLAYERS: usize = 4;

/// Source of shuffle indices. Swappable so tests can pin the assignment.
pub trait RandomSource {
    /// Returns an index in `0..upper`. `upper` is always at least 1.
    fn next_index(&mut self, upper: usize) -> usize;
}

/// `StdRng`-backed source, seeded from a fixed value or from the OS.
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl RandomSource for SeededRandom {
    fn next_index(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }
}

pub fn mafia_count(player_count: usize) -> usize {
    (player_count / 4).max(1)
}

/// Shuffles the players (Fisher–Yates) and hands out roles in order:
/// Mafia first, then one Doctor, one Detective, and Citizens for the rest.
pub fn assign_roles(
    players: &[PlayerId],
    rng: &mut dyn RandomSource,
) -> Result<HashMap<PlayerId, RoleType>, GameError> {
    if players.len() < MIN_PLAYERS {
        return Err(GameError::InsufficientPlayers {
            found: players.len(),
        });
    }

    let mut shuffled = players.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = rng.next_index(i + 1);
        shuffled.swap(i, j);
    }

    let mafia = mafia_count(shuffled.len());
    let roles = shuffled
        .into_iter()
        .enumerate()
        .map(|(seat, player)| {
            let role = match seat {
                s if s < mafia => RoleType::Mafia,
                s if s == mafia => RoleType::Doctor,
                s if s == mafia + 1 => RoleType::Detective,
                _ => RoleType::Citizen,
            };
            (player, role)
        })
        .collect();
    Ok(roles)
}
