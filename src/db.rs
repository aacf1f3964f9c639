// SQLite persistence layer for the personal queue and client state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::draft::session::PlayerId;

/// SQLite-backed persistence for queue entries and key-value client state.
///
/// The queue survives restarts and reconnects. Draft state itself is never
/// persisted here; the server is the source of truth and a fresh snapshot is
/// fetched on every startup.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS queue_entries (
                draft_id  TEXT NOT NULL,
                position  INTEGER NOT NULL,
                player_id TEXT NOT NULL,
                PRIMARY KEY (draft_id, position)
            );

            CREATE TABLE IF NOT EXISTS client_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Replace the stored queue for `draft_id` with `entries`, preserving
    /// order. Runs in a transaction so a crash mid-save never leaves a
    /// half-written queue.
    pub fn save_queue(&self, draft_id: &str, entries: &[PlayerId]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute(
            "DELETE FROM queue_entries WHERE draft_id = ?1",
            params![draft_id],
        )
        .context("failed to clear previous queue")?;
        for (position, player_id) in entries.iter().enumerate() {
            tx.execute(
                "INSERT INTO queue_entries (draft_id, position, player_id)
                 VALUES (?1, ?2, ?3)",
                params![draft_id, position as i64, player_id],
            )
            .context("failed to insert queue entry")?;
        }
        tx.commit().context("failed to commit queue save")?;
        Ok(())
    }

    /// Load the stored queue for `draft_id`, ordered by position. Returns an
    /// empty vec when nothing has been saved for this draft.
    pub fn load_queue(&self, draft_id: &str) -> Result<Vec<PlayerId>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_id FROM queue_entries
                 WHERE draft_id = ?1 ORDER BY position",
            )
            .context("failed to prepare load_queue query")?;

        let entries = stmt
            .query_map(params![draft_id], |row| row.get(0))
            .context("failed to query queue entries")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map queue rows")?;

        Ok(entries)
    }

    /// Delete the stored queue for a single draft.
    pub fn clear_queue(&self, draft_id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM queue_entries WHERE draft_id = ?1",
            params![draft_id],
        )
        .context("failed to clear queue")?;
        Ok(())
    }

    /// Persist an arbitrary JSON value under `key`. Uses INSERT OR REPLACE so
    /// repeated saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO client_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`. Returns `None` if the key
    /// does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM client_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| {
                let json_str: String = row.get(0)?;
                Ok(json_str)
            })
            .context("failed to query client state")?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read state row")?;
                let value: serde_json::Value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}
