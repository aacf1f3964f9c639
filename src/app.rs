// Application state and orchestration logic.
//
// The central event loop that coordinates push events from the draft server,
// user commands from the UI layer, and the pick-submission timeout. Owns the
// draft store and dispatcher and pushes UI updates to the render loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::dispatch::PickDispatcher;
use crate::draft::queue::EnqueueOutcome;
use crate::draft::store::{DraftStore, StoreEffect};
use crate::draft::turn::TurnState;
use crate::protocol::{
    ClientMessage, ConnectionStatus, PushEvent, ServerEvent, UiUpdate, UserCommand,
};
use crate::rest::SnapshotSource;

/// How often the event loop checks the in-flight pick submission for
/// timeout.
pub const TIMEOUT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub store: DraftStore,
    pub dispatcher: PickDispatcher,
    pub db: Database,
    pub snapshots: Arc<dyn SnapshotSource>,
    pub connection_status: ConnectionStatus,
    /// Sender feeding the WebSocket transport's outbound queue.
    pub ws_tx: mpsc::Sender<ClientMessage>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: DraftStore,
        db: Database,
        snapshots: Arc<dyn SnapshotSource>,
        ws_tx: mpsc::Sender<ClientMessage>,
    ) -> Self {
        let dispatcher = PickDispatcher::new(config.pick_timeout);
        AppState {
            config,
            store,
            dispatcher,
            db,
            snapshots,
            connection_status: ConnectionStatus::Disconnected,
            ws_tx,
        }
    }

    /// Persist the current queue contents so they survive a restart.
    fn persist_queue(&self) {
        if let Err(e) = self
            .db
            .save_queue(&self.config.draft_id, self.store.queue().entries())
        {
            warn!("Failed to persist queue: {e}");
        }
    }

    /// Fetch the authoritative snapshot and replace local state with it.
    ///
    /// All inconsistency recovery funnels through here; incremental events
    /// are never patched up locally.
    async fn resync(&mut self, ui_tx: &mpsc::Sender<UiUpdate>) {
        let snapshot = match self.snapshots.fetch_snapshot(&self.config.draft_id).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Resync failed: {e}");
                let _ = ui_tx
                    .send(UiUpdate::ActionRejected {
                        message: format!("resync failed: {e}"),
                    })
                    .await;
                return;
            }
        };

        match self.store.apply_snapshot(
            snapshot.session,
            snapshot.picks,
            snapshot.available_players,
        ) {
            Ok(effects) => {
                self.dispatcher.reconcile(&self.store);
                self.process_effects(effects, ui_tx).await;
                self.persist_queue();
                let _ = ui_tx.send(UiUpdate::Resynced).await;
                let _ = ui_tx
                    .send(UiUpdate::QueueChanged(
                        self.store.queue().entries().to_vec(),
                    ))
                    .await;
                info!("Resynced from snapshot");
            }
            Err(e) => {
                warn!("Snapshot rejected: {e}");
                let _ = ui_tx
                    .send(UiUpdate::ActionRejected {
                        message: format!("snapshot rejected: {e}"),
                    })
                    .await;
            }
        }
    }

    /// Translate store effects into UI updates, firing the auto-pick when
    /// the local user comes on the clock.
    async fn process_effects(
        &mut self,
        effects: Vec<StoreEffect>,
        ui_tx: &mpsc::Sender<UiUpdate>,
    ) {
        let mut queue_changed = false;
        for effect in effects {
            match effect {
                StoreEffect::TurnChanged(turn) => {
                    let _ = ui_tx.send(UiUpdate::TurnChanged(turn)).await;
                }
                StoreEffect::LocalUserOnClock { pick_number } => {
                    if let Some(msg) = self.dispatcher.maybe_auto_pick(&self.store, pick_number)
                    {
                        self.send_intent(msg, ui_tx).await;
                    }
                }
                StoreEffect::QueuePurged(player_id) => {
                    info!("Removed drafted player {player_id} from queue");
                    queue_changed = true;
                }
                StoreEffect::DraftCompleted => {
                    info!("Draft completed");
                    let _ = ui_tx.send(UiUpdate::DraftCompleted).await;
                }
            }
        }
        if queue_changed {
            self.persist_queue();
            let _ = ui_tx
                .send(UiUpdate::QueueChanged(
                    self.store.queue().entries().to_vec(),
                ))
                .await;
        }
    }

    /// Transmit a pick intent and notify the UI that it is pending.
    async fn send_intent(&self, msg: ClientMessage, ui_tx: &mpsc::Sender<UiUpdate>) {
        let player_id = match &msg {
            ClientMessage::PickIntent { player_id, .. } => player_id.clone(),
            _ => return,
        };
        if self.ws_tx.send(msg).await.is_err() {
            warn!("Transport channel closed, pick intent dropped");
            return;
        }
        let _ = ui_tx.send(UiUpdate::PickSubmitted { player_id }).await;
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. Push events from the WebSocket transport
/// 2. User commands from the UI layer
///
/// plus a periodic tick that expires stale pick submissions. Pushes UI
/// updates through `ui_tx` for the render loop.
pub async fn run(
    mut push_rx: mpsc::Receiver<PushEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut timeout_interval = tokio::time::interval(TIMEOUT_CHECK_INTERVAL);
    // The first tick completes immediately; consume it so the first
    // real check happens after one full interval.
    timeout_interval.tick().await;

    loop {
        tokio::select! {
            // --- Push events from the transport ---
            push_event = push_rx.recv() => {
                match push_event {
                    Some(event) => {
                        handle_push_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("Push channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Pick submission timeout check ---
            _ = timeout_interval.tick() => {
                if let Some(player_id) = state.dispatcher.check_timeout() {
                    let _ = ui_tx.send(UiUpdate::PickIndeterminate { player_id }).await;
                }
            }
        }
    }

    state.persist_queue();
    info!("Application event loop exiting");
    Ok(())
}

/// Handle an event delivered by the push transport.
///
/// Every connect (including reconnects) triggers a full resync: events
/// may have been broadcast while we were offline, and the snapshot is the
/// only way to close the gap.
pub(crate) async fn handle_push_event(
    state: &mut AppState,
    event: PushEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        PushEvent::Connected => {
            info!("Push channel connected");
            state.connection_status = ConnectionStatus::Connected;
            let _ = ui_tx
                .send(UiUpdate::ConnectionStatus(ConnectionStatus::Connected))
                .await;
            state.resync(ui_tx).await;
        }
        PushEvent::Disconnected => {
            info!("Push channel disconnected");
            state.connection_status = ConnectionStatus::Disconnected;
            let _ = ui_tx
                .send(UiUpdate::ConnectionStatus(ConnectionStatus::Disconnected))
                .await;
        }
        PushEvent::Event(server_event) => {
            handle_server_event(state, server_event, ui_tx).await;
        }
    }
}

/// Apply a broadcast event to the store. A rejection that indicates local
/// state has diverged from the server falls back to a full resync.
async fn handle_server_event(
    state: &mut AppState,
    event: ServerEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        ServerEvent::PickMade { pick } => {
            let pick_number = pick.pick_number;
            match state.store.apply_pick_made(pick) {
                Ok(effects) => {
                    state.dispatcher.on_pick_applied(pick_number);
                    state.process_effects(effects, ui_tx).await;
                }
                Err(e) if e.needs_resync() => {
                    warn!("Pick event rejected ({e}), resyncing");
                    state.resync(ui_tx).await;
                }
                Err(e) => {
                    warn!("Pick event rejected: {e}");
                }
            }
        }
        ServerEvent::Error { message } => {
            warn!("Server error: {message}");
            let _ = ui_tx.send(UiUpdate::ActionRejected { message }).await;
        }
        other => {
            let Some(status) = other.status_change() else {
                return;
            };
            match state.store.apply_status_change(status) {
                Ok(effects) => {
                    state.process_effects(effects, ui_tx).await;
                }
                Err(e) if e.needs_resync() => {
                    warn!("Status event rejected ({e}), resyncing");
                    state.resync(ui_tx).await;
                }
                Err(e) => {
                    warn!("Status event rejected: {e}");
                }
            }
        }
    }
}

/// Handle a user command from the UI layer.
pub(crate) async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Enqueue(player_id) => match state.store.enqueue(player_id.clone()) {
            Ok(EnqueueOutcome::Added) => {
                state.persist_queue();
                let _ = ui_tx
                    .send(UiUpdate::QueueChanged(
                        state.store.queue().entries().to_vec(),
                    ))
                    .await;
                // The queue may have been empty when this turn began; a
                // head queued mid-turn still gets the auto-submit.
                if let TurnState::OnClock {
                    is_local_user_turn: true,
                    pick_number,
                    ..
                } = *state.store.turn()
                {
                    if let Some(msg) =
                        state.dispatcher.maybe_auto_pick(&state.store, pick_number)
                    {
                        state.send_intent(msg, ui_tx).await;
                    }
                }
            }
            Ok(EnqueueOutcome::AlreadyQueued) => {
                let _ = ui_tx
                    .send(UiUpdate::ActionRejected {
                        message: format!("{player_id} is already queued"),
                    })
                    .await;
            }
            Ok(EnqueueOutcome::CapReached) => {
                let _ = ui_tx
                    .send(UiUpdate::ActionRejected {
                        message: format!(
                            "queue is full ({} players)",
                            state.store.queue().cap()
                        ),
                    })
                    .await;
            }
            Err(e) => {
                let _ = ui_tx
                    .send(UiUpdate::ActionRejected {
                        message: e.to_string(),
                    })
                    .await;
            }
        },
        UserCommand::RemoveFromQueue(player_id) => {
            if state.store.remove_from_queue(&player_id) {
                state.persist_queue();
                let _ = ui_tx
                    .send(UiUpdate::QueueChanged(
                        state.store.queue().entries().to_vec(),
                    ))
                    .await;
            }
        }
        UserCommand::ReorderQueue(player_id, direction) => {
            if state.store.reorder_queue(&player_id, direction) {
                state.persist_queue();
                let _ = ui_tx
                    .send(UiUpdate::QueueChanged(
                        state.store.queue().entries().to_vec(),
                    ))
                    .await;
            }
        }
        UserCommand::SubmitPick(player_id) => {
            match state.dispatcher.submit_pick(&state.store, player_id) {
                Ok(msg) => {
                    state.send_intent(msg, ui_tx).await;
                }
                Err(e) => {
                    let _ = ui_tx
                        .send(UiUpdate::ActionRejected {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }
        UserCommand::Resync => {
            state.resync(ui_tx).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop.
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
