// Draft state store: the single source of truth for session, picks,
// available players, and the personal queue.
//
// The store reconciles two input streams -- a wholesale REST snapshot and
// incremental push events -- and treats the server as the sole authority
// for pick ordering. Any event it cannot apply cleanly is rejected with an
// error whose `needs_resync()` tells the caller to discard incremental
// state and re-fetch a snapshot.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use super::queue::{Direction, EnqueueOutcome, PersonalQueue};
use super::session::{DraftSession, DraftStatus, Pick, PlayerId, SessionError, TeamId};
use super::turn::{team_on_clock, TurnError, TurnState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// An incremental event arrived before any snapshot was applied.
    #[error("no draft session loaded yet")]
    NoSession,

    /// A pick-made event whose pick number is not the one on the clock.
    /// The store cannot safely interpolate a gap.
    #[error("out-of-order pick: expected #{expected}, got #{got}")]
    OutOfOrderPick { expected: u32, got: u32 },

    /// A pick-made event for a player the store believes is already drafted
    /// (or never existed). Local state has drifted from the server.
    #[error("pick references unavailable player `{0}`")]
    PickedPlayerUnavailable(PlayerId),

    /// A status push that the session state machine does not permit.
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: DraftStatus, to: DraftStatus },

    /// Completion was pushed while picks remain on the board.
    #[error("completion pushed at pick {current_pick} of {total_picks}")]
    PrematureCompletion { current_pick: u32, total_picks: u32 },

    /// The snapshot itself is internally inconsistent.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] SessionError),

    /// The snapshot lists a player as both picked and available.
    #[error("snapshot lists drafted player `{0}` as available")]
    SnapshotAvailabilityConflict(PlayerId),

    #[error(transparent)]
    Turn(#[from] TurnError),

    /// A user action referencing a player not in the available set.
    #[error("player `{0}` is not available")]
    PlayerNotAvailable(PlayerId),
}

impl StoreError {
    /// Whether recovery requires discarding incremental state and
    /// re-fetching an authoritative snapshot.
    pub fn needs_resync(&self) -> bool {
        matches!(
            self,
            StoreError::NoSession
                | StoreError::OutOfOrderPick { .. }
                | StoreError::PickedPlayerUnavailable(_)
                | StoreError::InvalidTransition { .. }
                | StoreError::PrematureCompletion { .. }
        )
    }
}

/// Side effects of a successful store mutation, returned to the caller
/// instead of being delivered through callbacks so processing order stays
/// explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEffect {
    /// The derived turn state changed.
    TurnChanged(TurnState),
    /// It is now the local user's turn for `pick_number`; the dispatcher
    /// should consult the personal queue.
    LocalUserOnClock { pick_number: u32 },
    /// A queued player was drafted (by anyone) and removed from the queue.
    QueuePurged(PlayerId),
    /// The final pick landed and the session is complete.
    DraftCompleted,
}

/// Process-local draft state with a single writer.
pub struct DraftStore {
    session: Option<DraftSession>,
    picks: Vec<Pick>,
    available: HashSet<PlayerId>,
    queue: PersonalQueue,
    local_team_id: TeamId,
    turn: TurnState,
}

impl DraftStore {
    pub fn new(local_team_id: TeamId, queue: PersonalQueue) -> Self {
        DraftStore {
            session: None,
            picks: Vec::new(),
            available: HashSet::new(),
            queue,
            local_team_id,
            turn: TurnState::Idle,
        }
    }

    // -- read access -------------------------------------------------------

    pub fn session(&self) -> Option<&DraftSession> {
        self.session.as_ref()
    }

    pub fn picks(&self) -> &[Pick] {
        &self.picks
    }

    pub fn available(&self) -> &HashSet<PlayerId> {
        &self.available
    }

    pub fn is_available(&self, player_id: &PlayerId) -> bool {
        self.available.contains(player_id)
    }

    pub fn queue(&self) -> &PersonalQueue {
        &self.queue
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn local_team_id(&self) -> &TeamId {
        &self.local_team_id
    }

    // -- snapshot / push mutations ----------------------------------------

    /// Replace all state wholesale from an authoritative snapshot. Used on
    /// initial load and after every resync or transport reconnect.
    ///
    /// The personal queue survives the replacement but is pruned against
    /// the new available set (players drafted while we were away).
    pub fn apply_snapshot(
        &mut self,
        session: DraftSession,
        picks: Vec<Pick>,
        available: Vec<PlayerId>,
    ) -> Result<Vec<StoreEffect>, StoreError> {
        session.validate()?;

        let available: HashSet<PlayerId> = available.into_iter().collect();
        for pick in &picks {
            if available.contains(&pick.player_id) {
                return Err(StoreError::SnapshotAvailabilityConflict(
                    pick.player_id.clone(),
                ));
            }
        }

        // Resolve the turn before committing anything so a resolver failure
        // cannot leave a half-applied snapshot behind.
        let new_turn = TurnState::compute(&session, &self.local_team_id)?;

        self.session = Some(session);
        self.picks = picks;
        self.available = available;

        let mut effects = Vec::new();
        let purged: Vec<PlayerId> = self
            .queue
            .entries()
            .iter()
            .filter(|p| !self.available.contains(*p))
            .cloned()
            .collect();
        for player_id in purged {
            self.queue.remove(&player_id);
            effects.push(StoreEffect::QueuePurged(player_id));
        }

        self.apply_turn(new_turn, &mut effects);
        Ok(effects)
    }

    /// Apply an incremental pick-made push event.
    ///
    /// Rejects the event (leaving every piece of state untouched) unless
    /// `pick.pick_number` is exactly the pick on the clock and the player is
    /// still available; on rejection the caller must resync rather than
    /// interpolate.
    pub fn apply_pick_made(&mut self, pick: Pick) -> Result<Vec<StoreEffect>, StoreError> {
        let session = self.session.as_ref().ok_or(StoreError::NoSession)?;

        if pick.pick_number != session.current_pick {
            return Err(StoreError::OutOfOrderPick {
                expected: session.current_pick,
                got: pick.pick_number,
            });
        }
        if !self.available.contains(&pick.player_id) {
            return Err(StoreError::PickedPlayerUnavailable(pick.player_id));
        }

        // The server owns turn assignment; a mismatch with our resolver is
        // worth a warning but not a rejection.
        if let Ok(idx) = team_on_clock(
            session.current_pick,
            session.team_order.len(),
            session.draft_type,
        ) {
            if session.team_order[idx] != pick.team_id {
                warn!(
                    "pick #{} credited to {} but resolver expected {}",
                    pick.pick_number, pick.team_id, session.team_order[idx]
                );
            }
        }

        let mut effects = Vec::new();

        self.available.remove(&pick.player_id);
        if self.queue.remove(&pick.player_id) {
            effects.push(StoreEffect::QueuePurged(pick.player_id.clone()));
        }
        self.picks.push(pick);

        let session = self.session.as_mut().expect("session checked above");
        session.current_pick += 1;
        if session.current_pick > session.total_picks && session.status == DraftStatus::Active {
            session.status = DraftStatus::Completed;
            effects.push(StoreEffect::DraftCompleted);
        }

        self.recompute_turn(&mut effects)?;
        Ok(effects)
    }

    /// Apply a status-change push event, validating it against the session
    /// state machine. Completion is only legal once every pick is made.
    pub fn apply_status_change(
        &mut self,
        new_status: DraftStatus,
    ) -> Result<Vec<StoreEffect>, StoreError> {
        let session = self.session.as_ref().ok_or(StoreError::NoSession)?;

        if !session.status.allows_transition_to(new_status) {
            return Err(StoreError::InvalidTransition {
                from: session.status,
                to: new_status,
            });
        }
        if new_status == DraftStatus::Completed && !session.is_complete() {
            return Err(StoreError::PrematureCompletion {
                current_pick: session.current_pick,
                total_picks: session.total_picks,
            });
        }

        let session = self.session.as_mut().expect("session checked above");
        session.status = new_status;

        let mut effects = Vec::new();
        if new_status == DraftStatus::Completed {
            effects.push(StoreEffect::DraftCompleted);
        }
        self.recompute_turn(&mut effects)?;
        Ok(effects)
    }

    // -- queue mutations (user actions) -----------------------------------

    /// Queue a player, enforcing the invariant that the queue never holds
    /// a player absent from the available set.
    pub fn enqueue(&mut self, player_id: PlayerId) -> Result<EnqueueOutcome, StoreError> {
        if !self.available.contains(&player_id) {
            return Err(StoreError::PlayerNotAvailable(player_id));
        }
        Ok(self.queue.enqueue(player_id))
    }

    pub fn remove_from_queue(&mut self, player_id: &PlayerId) -> bool {
        self.queue.remove(player_id)
    }

    pub fn reorder_queue(&mut self, player_id: &PlayerId, direction: Direction) -> bool {
        self.queue.reorder(player_id, direction)
    }

    // -- internal ----------------------------------------------------------

    /// Recompute the derived turn state and append the matching effects.
    fn recompute_turn(&mut self, effects: &mut Vec<StoreEffect>) -> Result<(), StoreError> {
        let session = self.session.as_ref().ok_or(StoreError::NoSession)?;
        let new_turn = TurnState::compute(session, &self.local_team_id)?;
        self.apply_turn(new_turn, effects);
        Ok(())
    }

    /// Install an already-resolved turn state, appending change effects.
    fn apply_turn(&mut self, new_turn: TurnState, effects: &mut Vec<StoreEffect>) {
        if new_turn != self.turn {
            effects.push(StoreEffect::TurnChanged(new_turn.clone()));
            if let TurnState::OnClock {
                is_local_user_turn: true,
                pick_number,
                ..
            } = new_turn
            {
                effects.push(StoreEffect::LocalUserOnClock { pick_number });
            }
            self.turn = new_turn;
        }
    }
}
