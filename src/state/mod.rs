//! Snapshot persistence.
//!
//! The store is a seam: the run needs "prior snapshot in, new snapshot
//! out" and nothing more, so the JSON file used here can be swapped for
//! other storage without touching the pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::models::Snapshot;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Prior snapshot; the empty snapshot when nothing was persisted yet.
    async fn load(&self) -> Result<Snapshot>;

    /// Persist the run's snapshot, stamping the run timestamp.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Pretty-printed JSON file, one per watcher installation.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::default());
        }
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading state file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing state file {}", self.path.display()))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut stamped = snapshot.clone();
        stamped.updated_at = Some(Utc::now());

        let raw = serde_json::to_string_pretty(&stamped)?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("writing state file {}", self.path.display()))?;

        info!(path = %self.path.display(), entries = stamped.prices.len(), "state saved");
        Ok(())
    }
}
