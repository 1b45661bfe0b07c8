use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{
    command::CommandOutcome,
    night::{ActionKind, NightAction, NightActions},
    player::{PlayerId, PlayerView},
    role::{Faction, RoleType},
    vote::VoteTally,
};
use crate::error::GameError;
use crate::services::{
    role_assigner::{assign_roles, RandomSource},
    win_evaluator,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GamePhase {
    Lobby,
    Night,
    /// Reveal pause between the night's outcome and the day vote.
    NightResolved,
    Day,
    /// Reveal pause between the day's outcome and the next night.
    DayResolved,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightOutcome {
    pub deaths: Vec<PlayerId>,
    pub winner: Option<Faction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOutcome {
    pub eliminated: Option<(PlayerId, RoleType)>,
    pub winner: Option<Faction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub room_id: String,
    pub host_id: PlayerId,
    pub phase: GamePhase,
    pub round: u32,
    pub players: Vec<PlayerView>,
    pub night_actions_recorded: usize,
    pub votes_cast: usize,
    pub winner: Option<Faction>,
}

/// All per-room game state. Every mutation goes through a method that checks
/// the current phase first and leaves the state untouched on error.
#[derive(Debug, Clone)]
pub struct GameSession {
    room_id: String,
    host_id: PlayerId,
    players: Vec<PlayerId>,
    alive: Vec<PlayerId>,
    roles: HashMap<PlayerId, RoleType>,
    /// Players whose role was made public by a day elimination.
    revealed: HashSet<PlayerId>,
    phase: GamePhase,
    round: u32,
    night_actions: NightActions,
    votes: VoteTally,
    winner: Option<Faction>,
}

impl GameSession {
    pub fn new(room_id: impl Into<String>, host_id: impl Into<PlayerId>) -> Self {
        GameSession {
            room_id: room_id.into(),
            host_id: host_id.into(),
            players: Vec::new(),
            alive: Vec::new(),
            roles: HashMap::new(),
            revealed: HashSet::new(),
            phase: GamePhase::Lobby,
            round: 0,
            night_actions: NightActions::default(),
            votes: VoteTally::default(),
            winner: None,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn alive(&self) -> &[PlayerId] {
        &self.alive
    }

    pub fn is_alive(&self, player_id: &str) -> bool {
        self.alive.iter().any(|p| p == player_id)
    }

    pub fn role_of(&self, player_id: &str) -> Option<RoleType> {
        self.roles.get(player_id).copied()
    }

    pub fn roles(&self) -> &HashMap<PlayerId, RoleType> {
        &self.roles
    }

    pub fn night_actions(&self) -> &NightActions {
        &self.night_actions
    }

    pub fn votes(&self) -> &VoteTally {
        &self.votes
    }

    pub fn winner(&self) -> Option<Faction> {
        self.winner
    }

    fn expect_phase(&self, expected: GamePhase, operation: &'static str) -> Result<(), GameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GameError::InvalidState {
                operation,
                phase: self.phase,
            })
        }
    }

    pub fn join(&mut self, player_id: &str) -> Result<usize, GameError> {
        self.expect_phase(GamePhase::Lobby, "join")?;
        if self.players.iter().any(|p| p == player_id) {
            return Err(GameError::DuplicatePlayer(player_id.to_string()));
        }
        self.players.push(player_id.to_string());
        Ok(self.players.len())
    }

    /// Host-only. Assigns roles, marks everyone alive and opens the first night.
    pub fn start(
        &mut self,
        requester: &str,
        rng: &mut dyn RandomSource,
    ) -> Result<(), GameError> {
        self.expect_phase(GamePhase::Lobby, "start")?;
        if requester != self.host_id {
            return Err(GameError::Unauthorized(requester.to_string()));
        }
        self.roles = assign_roles(&self.players, rng)?;
        self.alive = self.players.clone();
        self.open_night()
    }

    pub fn open_night(&mut self) -> Result<(), GameError> {
        if !matches!(self.phase, GamePhase::Lobby | GamePhase::DayResolved) {
            return Err(GameError::InvalidState {
                operation: "open_night",
                phase: self.phase,
            });
        }
        self.night_actions.clear();
        self.round += 1;
        self.phase = GamePhase::Night;
        Ok(())
    }

    /// Records one secret action. Investigations are answered immediately and
    /// leave the rest of the session untouched.
    pub fn submit_action(
        &mut self,
        player_id: &str,
        action: NightAction,
    ) -> Result<CommandOutcome, GameError> {
        self.expect_phase(GamePhase::Night, "night_action")?;
        let role = self
            .role_of(player_id)
            .filter(|_| self.is_alive(player_id))
            .ok_or_else(|| GameError::Unauthorized(player_id.to_string()))?;
        if action.kind.role() != role {
            return Err(GameError::Unauthorized(player_id.to_string()));
        }
        if self.night_actions.has_acted(player_id) {
            return Err(GameError::DuplicateAction(player_id.to_string()));
        }
        if !self.is_alive(&action.target_id)
            || (action.kind == ActionKind::Investigate && action.target_id == player_id)
        {
            return Err(GameError::InvalidTarget(action.target_id));
        }

        let outcome = match action.kind {
            ActionKind::Investigate => CommandOutcome::Investigation {
                is_mafia: self.role_of(&action.target_id) == Some(RoleType::Mafia),
                target_id: action.target_id.clone(),
            },
            ActionKind::Kill | ActionKind::Save => CommandOutcome::ActionRecorded,
        };
        self.night_actions.record(player_id, action)?;
        Ok(outcome)
    }

    /// Alive players `player_id` may pick tonight. Detectives cannot pick themselves.
    pub fn night_candidates(&self, player_id: &str) -> Vec<PlayerId> {
        let skip_self = self.role_of(player_id) == Some(RoleType::Detective);
        self.alive
            .iter()
            .filter(|p| !(skip_self && p.as_str() == player_id))
            .cloned()
            .collect()
    }

    pub fn resolve_night(&mut self) -> Result<NightOutcome, GameError> {
        self.expect_phase(GamePhase::Night, "resolve_night")?;
        let deaths: Vec<PlayerId> = self.night_actions.casualty().cloned().into_iter().collect();
        self.alive.retain(|p| !deaths.contains(p));
        self.night_actions.clear();

        let winner = self.settle(GamePhase::NightResolved);
        Ok(NightOutcome { deaths, winner })
    }

    pub fn open_day(&mut self) -> Result<(), GameError> {
        self.expect_phase(GamePhase::NightResolved, "open_day")?;
        self.votes.clear();
        self.phase = GamePhase::Day;
        Ok(())
    }

    pub fn cast_vote(&mut self, voter_id: &str, target_id: &str) -> Result<(), GameError> {
        self.expect_phase(GamePhase::Day, "vote")?;
        if !self.is_alive(voter_id) {
            return Err(GameError::Unauthorized(voter_id.to_string()));
        }
        if !self.is_alive(target_id) {
            return Err(GameError::InvalidTarget(target_id.to_string()));
        }
        self.votes.record(voter_id, target_id)
    }

    pub fn resolve_day(&mut self) -> Result<DayOutcome, GameError> {
        self.expect_phase(GamePhase::Day, "resolve_day")?;
        let eliminated = self
            .votes
            .leader()
            .map(|(target, _)| target.clone())
            .and_then(|target| self.role_of(&target).map(|role| (target, role)));
        if let Some((target, _)) = &eliminated {
            self.alive.retain(|p| p != target);
            self.revealed.insert(target.clone());
        }
        self.votes.clear();

        let winner = self.settle(GamePhase::DayResolved);
        Ok(DayOutcome { eliminated, winner })
    }

    /// Runs the win check and moves to `Ended` or to `next`.
    fn settle(&mut self, next: GamePhase) -> Option<Faction> {
        let winner = win_evaluator::evaluate(&self.alive, &self.roles);
        match winner {
            Some(faction) => {
                self.winner = Some(faction);
                self.phase = GamePhase::Ended;
            }
            None => self.phase = next,
        }
        winner
    }

    /// Ends the session without a winner.
    pub fn abort(&mut self) {
        self.phase = GamePhase::Ended;
        self.night_actions.clear();
        self.votes.clear();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let ended = self.phase == GamePhase::Ended;
        let started = self.phase != GamePhase::Lobby;
        let players = self
            .players
            .iter()
            .map(|id| {
                let is_alive = !started || self.is_alive(id);
                PlayerView {
                    id: id.clone(),
                    is_alive,
                    revealed_role: if ended || self.revealed.contains(id) {
                        self.role_of(id)
                    } else {
                        None
                    },
                }
            })
            .collect();

        SessionSnapshot {
            room_id: self.room_id.clone(),
            host_id: self.host_id.clone(),
            phase: self.phase,
            round: self.round,
            players,
            night_actions_recorded: self.night_actions.len(),
            votes_cast: self.votes.ballots_cast(),
            winner: self.winner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl RandomSource for Identity {
        fn next_index(&mut self, upper: usize) -> usize {
            upper - 1
        }
    }

    /// P1 Mafia, P2 Doctor, P3 Detective, P4..P6 Citizens, first night open.
    fn started_session() -> GameSession {
        let mut session = GameSession::new("room", "P1");
        for i in 1..=6 {
            session.join(&format!("P{}", i)).unwrap();
        }
        session.start("P1", &mut Identity).unwrap();
        session
    }

    fn act(kind: ActionKind, target: &str) -> NightAction {
        NightAction {
            kind,
            target_id: target.to_string(),
        }
    }

    fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn join_rejects_duplicates_and_late_arrivals() {
        let mut session = GameSession::new("room", "host");
        assert_eq!(session.join("a"), Ok(1));
        assert_eq!(
            session.join("a"),
            Err(GameError::DuplicatePlayer("a".to_string()))
        );

        let mut session = started_session();
        assert_eq!(
            session.join("late"),
            Err(GameError::InvalidState {
                operation: "join",
                phase: GamePhase::Night
            })
        );
        assert_eq!(session.players().len(), 6);
    }

    #[test]
    fn only_the_host_can_start() {
        let mut session = GameSession::new("room", "host");
        for p in ["a", "b", "c", "d"] {
            session.join(p).unwrap();
        }
        assert_eq!(
            session.start("a", &mut Identity),
            Err(GameError::Unauthorized("a".to_string()))
        );
        assert_eq!(session.phase(), GamePhase::Lobby);
        assert!(session.roles().is_empty());
    }

    #[test]
    fn start_needs_four_players() {
        let mut session = GameSession::new("room", "host");
        for p in ["a", "b", "c"] {
            session.join(p).unwrap();
        }
        assert_eq!(
            session.start("host", &mut Identity),
            Err(GameError::InsufficientPlayers { found: 3 })
        );
        assert_eq!(session.phase(), GamePhase::Lobby);
    }

    #[test]
    fn start_opens_the_first_night() {
        let session = started_session();
        assert_eq!(session.phase(), GamePhase::Night);
        assert_eq!(session.round(), 1);
        assert_eq!(session.alive(), session.players());
        assert_eq!(session.role_of("P1"), Some(RoleType::Mafia));
    }

    #[test]
    fn duplicate_action_leaves_state_unchanged() {
        let mut session = started_session();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();

        let err = session
            .submit_action("P1", act(ActionKind::Kill, "P5"))
            .unwrap_err();
        assert_eq!(err, GameError::DuplicateAction("P1".to_string()));
        assert_eq!(
            session.night_actions().pending_kill().map(String::as_str),
            Some("P4")
        );
        assert_eq!(session.night_actions().len(), 1);
    }

    #[test]
    fn citizens_and_mismatched_roles_cannot_act() {
        let mut session = started_session();
        assert_eq!(
            session.submit_action("P4", act(ActionKind::Kill, "P5")),
            Err(GameError::Unauthorized("P4".to_string()))
        );
        assert_eq!(
            session.submit_action("P2", act(ActionKind::Kill, "P5")),
            Err(GameError::Unauthorized("P2".to_string()))
        );
        assert!(session.night_actions().is_empty());
    }

    #[test]
    fn detective_cannot_investigate_self() {
        let mut session = started_session();
        assert_eq!(
            session.submit_action("P3", act(ActionKind::Investigate, "P3")),
            Err(GameError::InvalidTarget("P3".to_string()))
        );
        assert!(!session.night_candidates("P3").contains(&"P3".to_string()));
        assert!(session.night_candidates("P2").contains(&"P2".to_string()));
    }

    #[test]
    fn investigation_reports_mafia_membership() {
        let mut session = started_session();
        let outcome = session
            .submit_action("P3", act(ActionKind::Investigate, "P1"))
            .unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::Investigation {
                target_id: "P1".to_string(),
                is_mafia: true
            }
        );
        assert_eq!(session.alive().len(), 6);
    }

    #[test]
    fn saved_target_survives_the_night() {
        let mut session = started_session();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();
        session.submit_action("P2", act(ActionKind::Save, "P4")).unwrap();

        let outcome = session.resolve_night().unwrap();
        assert!(outcome.deaths.is_empty());
        assert_eq!(session.alive().len(), 6);
        assert_eq!(session.phase(), GamePhase::NightResolved);
    }

    #[test]
    fn unsaved_target_dies() {
        let mut session = started_session();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();

        let outcome = session.resolve_night().unwrap();
        assert_eq!(outcome.deaths, ids(&["P4"]));
        assert!(!session.is_alive("P4"));
        assert!(session.night_actions().is_empty());
    }

    #[test]
    fn votes_only_during_the_day() {
        let mut session = started_session();
        assert_eq!(
            session.cast_vote("P2", "P1"),
            Err(GameError::InvalidState {
                operation: "vote",
                phase: GamePhase::Night
            })
        );
    }

    #[test]
    fn dead_players_neither_vote_nor_get_voted() {
        let mut session = started_session();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();
        session.resolve_night().unwrap();
        session.open_day().unwrap();

        assert_eq!(
            session.cast_vote("P4", "P1"),
            Err(GameError::Unauthorized("P4".to_string()))
        );
        assert_eq!(
            session.cast_vote("P2", "P4"),
            Err(GameError::InvalidTarget("P4".to_string()))
        );
        session.cast_vote("P2", "P1").unwrap();
        assert_eq!(
            session.cast_vote("P2", "P5"),
            Err(GameError::DuplicateVote("P2".to_string()))
        );
    }

    #[test]
    fn tied_day_eliminates_nobody() {
        let mut session = started_session();
        session.resolve_night().unwrap();
        session.open_day().unwrap();
        session.cast_vote("P1", "P4").unwrap();
        session.cast_vote("P4", "P1").unwrap();

        let outcome = session.resolve_day().unwrap();
        assert_eq!(outcome.eliminated, None);
        assert_eq!(outcome.winner, None);
        assert_eq!(session.alive().len(), 6);
        assert_eq!(session.phase(), GamePhase::DayResolved);

        session.open_night().unwrap();
        assert_eq!(session.round(), 2);
    }

    #[test]
    fn six_player_scenario_ends_with_town_win() {
        let mut session = started_session();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();
        session.submit_action("P2", act(ActionKind::Save, "P5")).unwrap();

        let night = session.resolve_night().unwrap();
        assert_eq!(night.deaths, ids(&["P4"]));
        assert_eq!(session.alive(), ids(&["P1", "P2", "P3", "P5", "P6"]).as_slice());
        assert_eq!(night.winner, None);

        session.open_day().unwrap();
        for voter in ["P5", "P2", "P6", "P3"] {
            session.cast_vote(voter, "P1").unwrap();
        }
        session.cast_vote("P1", "P3").unwrap();

        let day = session.resolve_day().unwrap();
        assert_eq!(day.eliminated, Some(("P1".to_string(), RoleType::Mafia)));
        assert_eq!(day.winner, Some(Faction::Town));
        assert_eq!(session.phase(), GamePhase::Ended);
        assert_eq!(session.winner(), Some(Faction::Town));
    }

    #[test]
    fn mafia_wins_at_parity() {
        let mut session = GameSession::new("room", "P1");
        for p in ["P1", "P2", "P3", "P4"] {
            session.join(p).unwrap();
        }
        session.start("P1", &mut Identity).unwrap();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();
        session.resolve_night().unwrap();
        session.open_day().unwrap();
        session.cast_vote("P1", "P2").unwrap();
        session.cast_vote("P3", "P2").unwrap();

        let day = session.resolve_day().unwrap();
        assert_eq!(day.eliminated, Some(("P2".to_string(), RoleType::Doctor)));
        assert_eq!(day.winner, Some(Faction::Mafia));
    }

    #[test]
    fn snapshot_hides_roles_of_living_players() {
        let mut session = started_session();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();
        session.resolve_night().unwrap();

        let snapshot = session.snapshot();
        let p1 = snapshot.players.iter().find(|p| p.id == "P1").unwrap();
        assert_eq!(p1.revealed_role, None);
    }

    #[test]
    fn night_deaths_keep_their_role_secret() {
        let mut session = started_session();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();
        session.resolve_night().unwrap();

        let snapshot = session.snapshot();
        let p4 = snapshot.players.iter().find(|p| p.id == "P4").unwrap();
        assert!(!p4.is_alive);
        assert_eq!(p4.revealed_role, None);
    }

    #[test]
    fn day_elimination_reveals_the_role() {
        let mut session = started_session();
        session.submit_action("P1", act(ActionKind::Kill, "P4")).unwrap();
        session.resolve_night().unwrap();
        session.open_day().unwrap();
        session.cast_vote("P1", "P5").unwrap();
        session.cast_vote("P2", "P5").unwrap();
        session.resolve_day().unwrap();

        assert_eq!(session.phase(), GamePhase::DayResolved);
        let snapshot = session.snapshot();
        let p4 = snapshot.players.iter().find(|p| p.id == "P4").unwrap();
        let p5 = snapshot.players.iter().find(|p| p.id == "P5").unwrap();
        assert!(!p5.is_alive);
        assert_eq!(p5.revealed_role, Some(RoleType::Citizen));
        assert_eq!(p4.revealed_role, None);
    }
}
