// Persistence trait for scraped tables and chart snapshots
use crate::domain::chart::Snapshot;
use crate::domain::payload::Payload;
use crate::error::ScrapeError;
use async_trait::async_trait;
use std::path::PathBuf;

pub const TABLE_HEADER: [&str; 3] = ["Facility Type", "Visit Date", "Average Time Spent"];
pub const SNAPSHOT_HEADER: [&str; 2] = ["Facility Type", "Min Average Time Spent"];

/// Files written for one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotArtifacts {
    pub index: usize,
    pub csv: PathBuf,
    pub screenshot: PathBuf,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Write the table payload, one row per (facility, date, value) triple
    async fn save_table(&self, payload: &Payload) -> Result<PathBuf, ScrapeError>;

    /// Write the snapshot CSV and its screenshot, both named by `snapshot.index`.
    /// An empty snapshot still produces a header-only CSV.
    async fn save_snapshot(
        &self,
        snapshot: &Snapshot,
        screenshot_png: &[u8],
    ) -> Result<SnapshotArtifacts, ScrapeError>;
}
