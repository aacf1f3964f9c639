// Draft session metadata: status lifecycle, pick records, team order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::turn::DraftType;

/// Server-assigned team identifier (e.g. "team_4").
pub type TeamId = String;

/// Server-assigned player identifier.
pub type PlayerId = String;

/// Lifecycle status of a draft session.
///
/// The client only ever requests transitions; the server is authoritative.
/// `allows_transition_to` encodes the legal state machine so out-of-order
/// or stale push events are detected instead of silently applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Scheduled,
    Active,
    Paused,
    Completed,
}

impl DraftStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Legal transitions: scheduled -> active, active -> paused,
    /// paused -> active, active -> completed.
    pub fn allows_transition_to(&self, next: DraftStatus) -> bool {
        use DraftStatus::*;
        matches!(
            (self, next),
            (Scheduled, Active) | (Active, Paused) | (Paused, Active) | (Active, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Scheduled => "scheduled",
            DraftStatus::Active => "active",
            DraftStatus::Paused => "paused",
            DraftStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("team order is empty")]
    EmptyTeamOrder,

    #[error("team order contains duplicate team id `{0}`")]
    DuplicateTeam(TeamId),

    #[error("total_picks {total_picks} != rounds {rounds} x {team_count} teams")]
    PickCountMismatch {
        total_picks: u32,
        rounds: u32,
        team_count: usize,
    },

    #[error("current_pick {current_pick} outside [1, {max}]")]
    CurrentPickOutOfRange { current_pick: u32, max: u32 },
}

/// A single draft session as reported by the server snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSession {
    /// Server-assigned draft identifier.
    pub draft_id: String,
    pub status: DraftStatus,
    /// The pick currently on the clock, 1-based. Sits at `total_picks + 1`
    /// once every pick has been made.
    pub current_pick: u32,
    pub total_picks: u32,
    pub rounds: u32,
    pub draft_type: DraftType,
    /// Round-1 pick order. Uniqueness is validated on snapshot apply.
    pub team_order: Vec<TeamId>,
}

impl DraftSession {
    /// Validate the structural invariants the server snapshot must satisfy:
    /// a non-empty, unique team order, `total_picks == rounds * |teams|`,
    /// and `current_pick` in `[1, total_picks + 1]`.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.team_order.is_empty() {
            return Err(SessionError::EmptyTeamOrder);
        }

        for (i, team) in self.team_order.iter().enumerate() {
            if self.team_order[..i].contains(team) {
                return Err(SessionError::DuplicateTeam(team.clone()));
            }
        }

        let expected = self.rounds * self.team_order.len() as u32;
        if self.total_picks != expected {
            return Err(SessionError::PickCountMismatch {
                total_picks: self.total_picks,
                rounds: self.rounds,
                team_count: self.team_order.len(),
            });
        }

        if self.current_pick < 1 || self.current_pick > self.total_picks + 1 {
            return Err(SessionError::CurrentPickOutOfRange {
                current_pick: self.current_pick,
                max: self.total_picks + 1,
            });
        }

        Ok(())
    }

    /// Whether every pick has been made.
    pub fn is_complete(&self) -> bool {
        self.current_pick > self.total_picks
    }
}

/// A completed draft pick as broadcast by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    /// Sequential pick number (1-indexed, unique per session).
    pub pick_number: u32,
    /// Team the player was drafted to.
    pub team_id: TeamId,
    /// The drafted player.
    pub player_id: PlayerId,
    /// Server-side completion time.
    pub picked_at: DateTime<Utc>,
    /// True when the server picked on the team's behalf (timer expiry or
    /// server-side queue consumption).
    pub is_auto_pick: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(current_pick: u32) -> DraftSession {
        DraftSession {
            draft_id: "d1".into(),
            status: DraftStatus::Active,
            current_pick,
            total_picks: 40,
            rounds: 10,
            draft_type: DraftType::Snake,
            team_order: (1..=4).map(|i| format!("team_{i}")).collect(),
        }
    }

    #[test]
    fn legal_transitions_allowed() {
        use DraftStatus::*;
        assert!(Scheduled.allows_transition_to(Active));
        assert!(Active.allows_transition_to(Paused));
        assert!(Paused.allows_transition_to(Active));
        assert!(Active.allows_transition_to(Completed));
    }

    #[test]
    fn illegal_transitions_rejected() {
        use DraftStatus::*;
        assert!(!Scheduled.allows_transition_to(Paused));
        assert!(!Scheduled.allows_transition_to(Completed));
        assert!(!Paused.allows_transition_to(Completed));
        assert!(!Paused.allows_transition_to(Scheduled));
        assert!(!Completed.allows_transition_to(Active));
        assert!(!Active.allows_transition_to(Scheduled));
        assert!(!Active.allows_transition_to(Active));
    }

    #[test]
    fn validate_accepts_consistent_session() {
        assert_eq!(session(1).validate(), Ok(()));
        assert_eq!(session(41).validate(), Ok(())); // completed position
    }

    #[test]
    fn validate_rejects_empty_team_order() {
        // total_picks = 0 would otherwise satisfy the arithmetic checks.
        let mut s = session(1);
        s.team_order.clear();
        s.total_picks = 0;
        s.rounds = 0;
        assert_eq!(s.validate(), Err(SessionError::EmptyTeamOrder));
    }

    #[test]
    fn validate_rejects_duplicate_teams() {
        let mut s = session(1);
        s.team_order[3] = s.team_order[0].clone();
        assert!(matches!(s.validate(), Err(SessionError::DuplicateTeam(_))));
    }

    #[test]
    fn validate_rejects_pick_count_mismatch() {
        let mut s = session(1);
        s.total_picks = 39;
        assert!(matches!(
            s.validate(),
            Err(SessionError::PickCountMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_current_pick_out_of_range() {
        let mut s = session(0);
        assert!(matches!(
            s.validate(),
            Err(SessionError::CurrentPickOutOfRange { .. })
        ));
        s.current_pick = 42;
        assert!(matches!(
            s.validate(),
            Err(SessionError::CurrentPickOutOfRange { .. })
        ));
    }

    #[test]
    fn is_complete_boundary() {
        assert!(!session(40).is_complete());
        assert!(session(41).is_complete());
    }

    #[test]
    fn status_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&DraftStatus::Scheduled).unwrap(),
            "\"scheduled\""
        );
        let s: DraftStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(s, DraftStatus::Paused);
    }
}
