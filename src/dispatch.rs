// Pick dispatcher: validates pick intents, tracks the single in-flight
// submission, and auto-submits the queue head when the user comes on the
// clock.
//
// Submissions follow the eventual-confirmation model: nothing mutates
// local state here. The store only changes when the server's `pick_made`
// broadcast arrives, so a server-side rejection (a race with another
// client) never forks local state.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::draft::session::PlayerId;
use crate::draft::store::DraftStore;
use crate::draft::turn::TurnState;
use crate::protocol::ClientMessage;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("it is not your turn to pick")]
    NotYourTurn,

    #[error("player `{0}` is no longer available")]
    PlayerUnavailable(PlayerId),

    /// A submission for this turn is already awaiting the server's
    /// broadcast. A second send could produce a duplicate pick.
    #[error("a pick submission is already in flight")]
    SubmissionInFlight,

    /// The store has no session loaded, so there is no draft to pick in.
    #[error("no draft session loaded")]
    NoSession,
}

/// The one submission that may be awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub player_id: PlayerId,
    /// The pick number on the clock when the intent was sent. The matching
    /// `pick_made` broadcast carries the same number.
    pub pick_number: u32,
    pub sent_at: Instant,
}

pub struct PickDispatcher {
    /// How long to wait for the server's broadcast before declaring the
    /// submission indeterminate.
    timeout: Duration,
    in_flight: Option<InFlight>,
    /// Last pick number for which the auto-dispatcher fired, so redundant
    /// turn notifications for the same pick never double-submit.
    last_auto_pick_number: Option<u32>,
}

impl PickDispatcher {
    pub fn new(timeout: Duration) -> Self {
        PickDispatcher {
            timeout,
            in_flight: None,
            last_auto_pick_number: None,
        }
    }

    pub fn in_flight(&self) -> Option<&InFlight> {
        self.in_flight.as_ref()
    }

    /// Validate and stage a pick intent for `player_id`.
    ///
    /// Fails synchronously (no network action) unless it is the local
    /// user's turn, the player is available, and nothing is in flight.
    /// On success the returned [`ClientMessage`] is what the transport
    /// must send; local state is untouched until confirmation.
    pub fn submit_pick(
        &mut self,
        store: &DraftStore,
        player_id: PlayerId,
    ) -> Result<ClientMessage, DispatchError> {
        let session = store.session().ok_or(DispatchError::NoSession)?;

        let pick_number = match store.turn() {
            TurnState::OnClock {
                is_local_user_turn: true,
                pick_number,
                ..
            } => *pick_number,
            _ => return Err(DispatchError::NotYourTurn),
        };

        if !store.is_available(&player_id) {
            return Err(DispatchError::PlayerUnavailable(player_id));
        }
        if self.in_flight.is_some() {
            return Err(DispatchError::SubmissionInFlight);
        }

        self.in_flight = Some(InFlight {
            player_id: player_id.clone(),
            pick_number,
            sent_at: Instant::now(),
        });
        info!("Submitting pick #{pick_number}: player {player_id}");

        Ok(ClientMessage::PickIntent {
            draft_id: session.draft_id.clone(),
            player_id,
        })
    }

    /// Called when the user's turn begins (or is re-notified). Submits the
    /// queue head exactly once per pick number.
    ///
    /// Returns the intent to transmit, or `None` when there is nothing to
    /// do (empty queue, already fired for this pick, or a validation
    /// failure, which is logged rather than surfaced -- the user can still
    /// pick manually).
    pub fn maybe_auto_pick(
        &mut self,
        store: &DraftStore,
        pick_number: u32,
    ) -> Option<ClientMessage> {
        if self.last_auto_pick_number == Some(pick_number) {
            return None;
        }
        let head = store.queue().front()?.clone();

        // Mark the pick as attempted before submitting so a failure below
        // cannot be retried by a redundant notification.
        self.last_auto_pick_number = Some(pick_number);

        match self.submit_pick(store, head) {
            Ok(msg) => {
                info!("Auto-submitting queued pick for #{pick_number}");
                Some(msg)
            }
            Err(e) => {
                warn!("Auto-pick for #{pick_number} skipped: {e}");
                None
            }
        }
    }

    /// A `pick_made` broadcast was applied by the store. Clears the
    /// in-flight record when it covers the awaited pick number, whether or
    /// not our player won it (either way, that turn is settled).
    pub fn on_pick_applied(&mut self, pick_number: u32) {
        if let Some(in_flight) = &self.in_flight {
            if pick_number >= in_flight.pick_number {
                self.in_flight = None;
            }
        }
    }

    /// Drop an in-flight record that a fresh snapshot proves settled
    /// (the draft has moved past its pick number).
    pub fn reconcile(&mut self, store: &DraftStore) {
        let Some(session) = store.session() else {
            return;
        };
        if let Some(in_flight) = &self.in_flight {
            if session.current_pick > in_flight.pick_number {
                self.in_flight = None;
            }
        }
    }

    /// Expire the in-flight submission if its timeout has elapsed.
    ///
    /// Returns the affected player so the caller can surface an
    /// indeterminate outcome. Clearing the record permits a *manual*
    /// retry; nothing here resends automatically, since an acknowledgment
    /// might still be on the wire.
    pub fn check_timeout(&mut self) -> Option<PlayerId> {
        let expired = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.sent_at.elapsed() > self.timeout);
        if expired {
            let in_flight = self.in_flight.take().expect("checked above");
            warn!(
                "Pick submission for {} (pick #{}) timed out; outcome unknown",
                in_flight.player_id, in_flight.pick_number
            );
            return Some(in_flight.player_id);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::queue::PersonalQueue;
    use crate::draft::session::{DraftSession, DraftStatus, Pick};
    use crate::draft::turn::DraftType;
    use chrono::Utc;

    fn session() -> DraftSession {
        DraftSession {
            draft_id: "d1".into(),
            status: DraftStatus::Active,
            current_pick: 1,
            total_picks: 8,
            rounds: 2,
            draft_type: DraftType::Snake,
            team_order: (1..=4).map(|i| format!("team_{i}")).collect(),
        }
    }

    fn players(n: usize) -> Vec<PlayerId> {
        (1..=n).map(|i| format!("P{i}")).collect()
    }

    /// Store where the local user ("team_1") is on the clock for pick 1.
    fn store_on_clock() -> DraftStore {
        let mut store = DraftStore::new("team_1".into(), PersonalQueue::new(25));
        store
            .apply_snapshot(session(), vec![], players(12))
            .unwrap();
        store
    }

    /// Store where the local user ("team_4") is NOT on the clock.
    fn store_off_clock() -> DraftStore {
        let mut store = DraftStore::new("team_4".into(), PersonalQueue::new(25));
        store
            .apply_snapshot(session(), vec![], players(12))
            .unwrap();
        store
    }

    fn confirm(number: u32, team: &str, player: &str) -> Pick {
        Pick {
            pick_number: number,
            team_id: team.into(),
            player_id: player.into(),
            picked_at: Utc::now(),
            is_auto_pick: false,
        }
    }

    #[tokio::test]
    async fn submit_valid_pick_returns_intent() {
        let store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        let msg = dispatcher.submit_pick(&store, "P5".into()).unwrap();
        assert_eq!(
            msg,
            ClientMessage::PickIntent {
                draft_id: "d1".into(),
                player_id: "P5".into(),
            }
        );
        assert_eq!(dispatcher.in_flight().unwrap().pick_number, 1);
    }

    #[tokio::test]
    async fn submit_off_turn_rejected_without_send() {
        let store = store_off_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        assert_eq!(
            dispatcher.submit_pick(&store, "P5".into()),
            Err(DispatchError::NotYourTurn)
        );
        assert!(dispatcher.in_flight().is_none());
    }

    #[tokio::test]
    async fn submit_unavailable_player_rejected() {
        let store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        assert_eq!(
            dispatcher.submit_pick(&store, "P99".into()),
            Err(DispatchError::PlayerUnavailable("P99".into()))
        );
    }

    #[tokio::test]
    async fn double_submit_rejected_while_in_flight() {
        // A second submit for P5 while the first awaits
        // confirmation must be rejected with no network request.
        let store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        dispatcher.submit_pick(&store, "P5".into()).unwrap();
        assert_eq!(
            dispatcher.submit_pick(&store, "P5".into()),
            Err(DispatchError::SubmissionInFlight)
        );
    }

    #[tokio::test]
    async fn confirmation_clears_in_flight() {
        let mut store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        dispatcher.submit_pick(&store, "P5".into()).unwrap();

        store.apply_pick_made(confirm(1, "team_1", "P5")).unwrap();
        dispatcher.on_pick_applied(1);
        assert!(dispatcher.in_flight().is_none());
    }

    #[tokio::test]
    async fn losing_the_race_also_clears_in_flight() {
        // Another client's pick settles the same pick number.
        let mut store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        dispatcher.submit_pick(&store, "P5".into()).unwrap();

        store.apply_pick_made(confirm(1, "team_1", "P7")).unwrap();
        dispatcher.on_pick_applied(1);
        assert!(dispatcher.in_flight().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_surfaces_indeterminate_and_allows_manual_retry() {
        let store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        dispatcher.submit_pick(&store, "P5".into()).unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(dispatcher.check_timeout(), Some("P5".into()));
        assert!(dispatcher.in_flight().is_none());

        // Manual retry is possible once the in-flight record is gone.
        assert!(dispatcher.submit_pick(&store, "P5".into()).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn no_timeout_before_deadline() {
        let store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        dispatcher.submit_pick(&store, "P5".into()).unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(dispatcher.check_timeout(), None);
        assert!(dispatcher.in_flight().is_some());
    }

    #[tokio::test]
    async fn auto_pick_fires_once_per_turn() {
        let mut store = store_on_clock();
        store.enqueue("P3".into()).unwrap();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));

        let msg = dispatcher.maybe_auto_pick(&store, 1);
        assert!(matches!(
            msg,
            Some(ClientMessage::PickIntent { ref player_id, .. }) if player_id == "P3"
        ));

        // Redundant notification for the same pick number: no refire.
        assert_eq!(dispatcher.maybe_auto_pick(&store, 1), None);
    }

    #[tokio::test]
    async fn auto_pick_noop_with_empty_queue() {
        let store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        assert_eq!(dispatcher.maybe_auto_pick(&store, 1), None);
        // An empty queue does not consume the once-per-turn guard; a later
        // enqueue during the same turn may still auto-fire.
        assert_eq!(dispatcher.last_auto_pick_number, None);
    }

    #[tokio::test]
    async fn reconcile_drops_settled_in_flight() {
        let mut store = store_on_clock();
        let mut dispatcher = PickDispatcher::new(Duration::from_secs(10));
        dispatcher.submit_pick(&store, "P5".into()).unwrap();

        // Resync shows the draft moved past our pick.
        let mut s = session();
        s.current_pick = 3;
        store
            .apply_snapshot(
                s,
                vec![confirm(1, "team_1", "P5"), confirm(2, "team_2", "P6")],
                players(12)
                    .into_iter()
                    .filter(|p| p != "P5" && p != "P6")
                    .collect(),
            )
            .unwrap();
        dispatcher.reconcile(&store);
        assert!(dispatcher.in_flight().is_none());
    }
}
