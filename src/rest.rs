// REST snapshot client.
//
// Resyncs are served over plain HTTP rather than the push channel: the app
// fetches a full authoritative snapshot whenever local state is stale or a
// gap is detected in the broadcast stream.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::protocol::SnapshotResponse;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("snapshot request returned status {status}")]
    Status { status: u16 },

    #[error("no draft found with id {draft_id}")]
    DraftNotFound { draft_id: String },
}

/// Source of authoritative draft snapshots.
///
/// Abstracted behind a trait so tests can serve canned snapshots without a
/// running server.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self, draft_id: &str) -> Result<SnapshotResponse, SnapshotError>;
}

/// Fetches snapshots from the draft server's REST API.
pub struct HttpSnapshotSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSnapshotSource {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn snapshot_url(&self, draft_id: &str) -> String {
        format!(
            "{}/drafts/{}/snapshot",
            self.base_url.trim_end_matches('/'),
            draft_id
        )
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_snapshot(&self, draft_id: &str) -> Result<SnapshotResponse, SnapshotError> {
        let url = self.snapshot_url(draft_id);
        debug!(%url, "fetching draft snapshot");

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status.as_u16() == 404 {
            return Err(SnapshotError::DraftNotFound {
                draft_id: draft_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(SnapshotError::Status {
                status: status.as_u16(),
            });
        }

        let snapshot = response.json::<SnapshotResponse>().await?;
        Ok(snapshot)
    }
}
