// Turn resolution: which team is on the clock for a given pick.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::session::{DraftSession, DraftStatus, TeamId};

/// How the pick order cycles through the team order each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftType {
    /// Team order reverses on even rounds.
    Snake,
    /// Same team order every round.
    Linear,
}

impl DraftType {
    /// Parse a draft-type string as it appears in config files and wire
    /// payloads ("snake" / "linear"). An unrecognized value is a
    /// configuration error, not a silent default.
    pub fn from_str_type(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "snake" => Some(DraftType::Snake),
            "linear" => Some(DraftType::Linear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DraftType::Snake => "snake",
            DraftType::Linear => "linear",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    /// A draft cannot be configured with zero teams.
    #[error("draft has no teams in its order")]
    NoTeams,
}

/// 1-based round number for a 1-based pick number.
pub fn round_of(pick_number: u32, team_count: usize) -> u32 {
    debug_assert!(team_count > 0);
    (pick_number - 1) / team_count as u32 + 1
}

/// Resolve the 0-based index into the team order for the team on the clock
/// at `current_pick` (1-based).
///
/// Callers must check for draft completion (`current_pick > total_picks`)
/// before resolving; this function only knows about the cycling pattern.
pub fn team_on_clock(
    current_pick: u32,
    team_count: usize,
    draft_type: DraftType,
) -> Result<usize, TurnError> {
    if team_count == 0 {
        return Err(TurnError::NoTeams);
    }
    let round = round_of(current_pick, team_count);
    let position_in_round = ((current_pick - 1) as usize % team_count) + 1;

    let index = match draft_type {
        DraftType::Snake if round % 2 == 0 => team_count - position_in_round,
        _ => position_in_round - 1,
    };
    Ok(index)
}

/// Derived turn state. Recomputed from the session after every mutation,
/// never stored independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    /// The draft has not started, is paused, or has finished; nobody is
    /// on the clock.
    Idle,
    /// A team is on the clock.
    OnClock {
        current_team_id: TeamId,
        is_local_user_turn: bool,
        round: u32,
        /// The pick this turn will produce. Used to fire per-turn actions
        /// exactly once across redundant state-change notifications.
        pick_number: u32,
    },
}

impl TurnState {
    /// Compute the turn state for `session` from the point of view of
    /// `local_team_id`.
    ///
    /// Returns `Idle` unless the session is active with picks remaining.
    /// A session with an empty team order is a configuration error and
    /// surfaces as `TurnError::NoTeams`.
    pub fn compute(session: &DraftSession, local_team_id: &TeamId) -> Result<TurnState, TurnError> {
        if session.team_order.is_empty() {
            return Err(TurnError::NoTeams);
        }
        if session.status != DraftStatus::Active || session.current_pick > session.total_picks {
            return Ok(TurnState::Idle);
        }

        let idx = team_on_clock(
            session.current_pick,
            session.team_order.len(),
            session.draft_type,
        )?;
        let current_team_id = session.team_order[idx].clone();
        let is_local_user_turn = &current_team_id == local_team_id;
        Ok(TurnState::OnClock {
            current_team_id,
            is_local_user_turn,
            round: round_of(session.current_pick, session.team_order.len()),
            pick_number: session.current_pick,
        })
    }

    /// Whether the local user is the team on the clock.
    pub fn is_local_user_turn(&self) -> bool {
        matches!(
            self,
            TurnState::OnClock {
                is_local_user_turn: true,
                ..
            }
        )
    }
}
