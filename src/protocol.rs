// Wire protocol with the draft server, plus the internal message types
// passed between the transport task, the app event loop, and the UI layer.
//
// Push events and client messages are JSON with a `type` discriminator,
// matching the server's socket event names (pick_made, draft_paused, ...).

use serde::{Deserialize, Serialize};

use crate::draft::queue::Direction;
use crate::draft::session::{DraftSession, DraftStatus, Pick, PlayerId, TeamId};
use crate::draft::turn::TurnState;

// ---------------------------------------------------------------------------
// Inbound push events
// ---------------------------------------------------------------------------

/// A typed event received on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A pick was confirmed by the server and broadcast to the room.
    PickMade { pick: Pick },
    /// Generic status transition carrying the new status.
    StatusChanged { status: DraftStatus },
    /// Named status transitions emitted by older server builds; folded
    /// into the equivalent status by [`ServerEvent::status_change`].
    DraftStarted,
    DraftPaused,
    DraftResumed,
    DraftCompleted,
    /// Server-side rejection of something we sent.
    Error { message: String },
}

impl ServerEvent {
    /// The status this event transitions the session to, if it is a
    /// status-change event of either spelling.
    pub fn status_change(&self) -> Option<DraftStatus> {
        match self {
            ServerEvent::StatusChanged { status } => Some(*status),
            ServerEvent::DraftStarted | ServerEvent::DraftResumed => Some(DraftStatus::Active),
            ServerEvent::DraftPaused => Some(DraftStatus::Paused),
            ServerEvent::DraftCompleted => Some(DraftStatus::Completed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound client messages
// ---------------------------------------------------------------------------

/// A message sent to the server over the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinDraftRoom { draft_id: String, team_id: TeamId },
    LeaveDraftRoom { draft_id: String },
    /// A pick request. The pick is not applied locally until the matching
    /// `pick_made` broadcast comes back.
    PickIntent { draft_id: String, player_id: PlayerId },
}

// ---------------------------------------------------------------------------
// REST snapshot
// ---------------------------------------------------------------------------

/// The authoritative snapshot returned by the REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub session: DraftSession,
    pub picks: Vec<Pick>,
    pub available_players: Vec<PlayerId>,
}

// ---------------------------------------------------------------------------
// Transport -> app events
// ---------------------------------------------------------------------------

/// Events delivered by the push transport into the app loop's inbound queue.
/// The transport owns reconnection; the app layer treats every `Connected`
/// after the first as a mandatory resync trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected,
    Event(ServerEvent),
}

/// Whether the push transport currently has a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

// ---------------------------------------------------------------------------
// UI boundary
// ---------------------------------------------------------------------------

/// Commands from the UI layer into the app loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Enqueue(PlayerId),
    RemoveFromQueue(PlayerId),
    ReorderQueue(PlayerId, Direction),
    SubmitPick(PlayerId),
    /// Manual re-fetch of the authoritative snapshot.
    Resync,
    Quit,
}

/// Updates pushed to the UI layer. The core never fails hard into the UI;
/// everything surfaces as one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    ConnectionStatus(ConnectionStatus),
    /// State was replaced or advanced; carries the new turn.
    TurnChanged(TurnState),
    /// The personal queue changed (user edit or purge).
    QueueChanged(Vec<PlayerId>),
    /// A user action was rejected locally; nothing was sent.
    ActionRejected { message: String },
    /// A pick intent went out and awaits the server's broadcast.
    PickSubmitted { player_id: PlayerId },
    /// No confirmation arrived within the timeout. The outcome is unknown;
    /// the user may retry manually.
    PickIndeterminate { player_id: PlayerId },
    /// A resynchronization was performed (or attempted) after an
    /// inconsistency or reconnect.
    Resynced,
    DraftCompleted,
}
