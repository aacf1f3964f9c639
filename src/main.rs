// Draft room client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database, restore the persisted queue
// 4. Build the draft store and app state
// 5. Create mpsc channels
// 6. Spawn WebSocket transport task
// 7. Spawn app logic task
// 8. Wait for Ctrl+C
// 9. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use draft_room::app;
use draft_room::config;
use draft_room::db;
use draft_room::draft::queue::PersonalQueue;
use draft_room::draft::store::DraftStore;
use draft_room::protocol::UserCommand;
use draft_room::rest::HttpSnapshotSource;
use draft_room::ws_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Draft room client starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: draft={}, team={}, {} draft",
        config.draft_id,
        config.my_team_id,
        config.draft_type.as_str()
    );

    // 3. Open database and restore the persisted queue
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // A changed draft id means the persisted queue belongs to a finished
    // draft; drop it rather than carry it forward.
    if let Some(previous) = db.load_state("last_draft_id")? {
        if let Some(old_id) = previous.as_str() {
            if old_id != config.draft_id {
                db.clear_queue(old_id)
                    .context("failed to drop stale queue")?;
                info!("Dropped queue persisted for previous draft {old_id}");
            }
        }
    }
    db.save_state(
        "last_draft_id",
        &serde_json::Value::String(config.draft_id.clone()),
    )?;

    let stored_entries = db
        .load_queue(&config.draft_id)
        .context("failed to load persisted queue")?;
    if !stored_entries.is_empty() {
        info!("Restored {} queued players", stored_entries.len());
    }
    let queue = PersonalQueue::from_entries(stored_entries, config.queue_cap);

    // 4. Build the draft store. It starts empty; the first snapshot after
    // the transport connects populates it.
    let store = DraftStore::new(config.my_team_id.clone(), queue);
    let snapshots = Arc::new(HttpSnapshotSource::new(config.base_url.clone()));

    // 5. Create mpsc channels
    let (push_tx, push_rx) = mpsc::channel(256);
    let (out_tx, out_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);

    let app_state = app::AppState::new(config.clone(), store, db, snapshots, out_tx);

    // 6. Spawn WebSocket transport task
    let ws_url = config.ws_url.clone();
    let draft_id = config.draft_id.clone();
    let team_id = config.my_team_id.clone();
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_client::run(ws_url, draft_id, team_id, push_tx, out_rx).await {
            error!("WebSocket transport error: {e}");
        }
    });

    // 7. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(push_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {e}");
        }
    });

    // Drain UI updates so the app loop never blocks on a full channel.
    // A rendering frontend would consume this channel instead.
    let ui_handle = tokio::spawn(async move {
        while let Some(update) = ui_rx.recv().await {
            debug!("UI update: {update:?}");
        }
    });

    // 8. Wait for Ctrl+C
    info!("Application ready");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let _ = cmd_tx.send(UserCommand::Quit).await;

    // 9. Cleanup: wait for the app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    // Abort the transport (it loops forever) and the UI drain.
    ws_handle.abort();
    ui_handle.abort();

    info!("Draft room client shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (keeps the terminal free for a
/// frontend).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftroom.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draft_room=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
