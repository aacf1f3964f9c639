// WebSocket client for the draft server's push channel.

use std::time::Duration;

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::protocol::{ClientMessage, PushEvent, ServerEvent};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Run the WebSocket client, forwarding push events through `tx` and sending
/// outbound messages from `outgoing_rx`.
///
/// Connects to `ws_url`, joins the draft room, then relays broadcast events
/// until the connection drops. Reconnects with exponential backoff; every
/// reconnect emits [`PushEvent::Connected`] so the app layer knows to resync.
/// Returns when the app side of either channel is closed.
pub async fn run(
    ws_url: String,
    draft_id: String,
    team_id: String,
    tx: mpsc::Sender<PushEvent>,
    mut outgoing_rx: mpsc::Receiver<ClientMessage>,
) -> anyhow::Result<()> {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let ws_stream = match connect_async(&ws_url).await {
            Ok((ws, _response)) => {
                info!("Connected to draft server at {ws_url}");
                backoff = INITIAL_BACKOFF;
                ws
            }
            Err(e) => {
                warn!("Connection to {ws_url} failed: {e}; retrying in {backoff:?}");
                retry_delay(&mut backoff).await;
                continue;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let join = ClientMessage::JoinDraftRoom {
            draft_id: draft_id.clone(),
            team_id: team_id.clone(),
        };
        if let Err(e) = write.send(encode(&join)?).await {
            warn!("Failed to join draft room: {e}; retrying in {backoff:?}");
            retry_delay(&mut backoff).await;
            continue;
        }

        if tx.send(PushEvent::Connected).await.is_err() {
            return Ok(());
        }

        // Relay until the connection drops or the app shuts down.
        let app_closed = loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if forward_text(&text, &tx).await.is_err() {
                            break true;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Server sent close frame");
                        break false;
                    }
                    Some(Ok(_)) => {
                        // Ignore Binary, Ping, Pong, Frame variants.
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {e}");
                        break false;
                    }
                    None => break false,
                },
                outbound = outgoing_rx.recv() => match outbound {
                    Some(message) => {
                        if let Err(e) = write.send(encode(&message)?).await {
                            warn!("Failed to send message: {e}");
                            break false;
                        }
                    }
                    None => break true,
                },
            }
        };

        if app_closed {
            return Ok(());
        }
        if tx.send(PushEvent::Disconnected).await.is_err() {
            return Ok(());
        }

        retry_delay(&mut backoff).await;
    }
}

/// Sleep for the current backoff, then double it up to [`MAX_BACKOFF`].
async fn retry_delay(backoff: &mut Duration) {
    tokio::time::sleep(*backoff).await;
    *backoff = (*backoff * 2).min(MAX_BACKOFF);
}

fn encode(message: &ClientMessage) -> anyhow::Result<Message> {
    let json = serde_json::to_string(message)?;
    Ok(Message::Text(json.into()))
}

/// Parse a text frame and forward it as a [`PushEvent`]. Malformed or unknown
/// payloads are logged and dropped; they never tear down the connection.
/// Returns `Err(())` when the app side of the channel is closed.
async fn forward_text(text: &str, tx: &mpsc::Sender<PushEvent>) -> Result<(), ()> {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => {
            if tx.send(PushEvent::Event(event)).await.is_err() {
                return Err(());
            }
        }
        Err(e) => {
            warn!("Ignoring unrecognized server payload: {e}");
        }
    }
    Ok(())
}

/// Process raw WebSocket [`Message`] items from any [`Stream`], forwarding
/// parsed events through `tx`. This is a pure-logic function that requires
/// no I/O and is the primary unit-test target.
pub async fn process_event_stream<St>(
    mut stream: St,
    tx: &mpsc::Sender<PushEvent>,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                forward_text(&text, tx).await?;
            }
            Ok(Message::Close(_)) => {
                info!("Server sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}
