// Filesystem snapshot store - CSV tables and PNG screenshots
use crate::application::snapshot_store::{
    SnapshotArtifacts, SnapshotStore, SNAPSHOT_HEADER, TABLE_HEADER,
};
use crate::domain::chart::Snapshot;
use crate::domain::payload::Payload;
use crate::error::ScrapeError;
use crate::infrastructure::config::OutputSettings;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const TABLE_FILE: &str = "table.csv";

#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    csv_dir: PathBuf,
    screenshot_dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(csv_dir: impl Into<PathBuf>, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            csv_dir: csv_dir.into(),
            screenshot_dir: screenshot_dir.into(),
        }
    }

    pub fn from_settings(output: &OutputSettings) -> Self {
        Self::new(&output.csv_dir, &output.screenshot_dir)
    }

    pub fn table_path(&self) -> PathBuf {
        self.csv_dir.join(TABLE_FILE)
    }

    pub fn snapshot_csv_path(&self, index: usize) -> PathBuf {
        self.csv_dir.join(format!("doughnut{}.csv", index))
    }

    pub fn screenshot_path(&self, index: usize) -> PathBuf {
        self.screenshot_dir.join(format!("screenshot{}.png", index))
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn encode_csv<I>(path: &Path, header: &[&str], rows: I) -> Result<Vec<u8>, ScrapeError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let csv_err = |source: csv::Error| ScrapeError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        writer.write_record(&row).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv_err(csv::Error::from(e.into_error())))
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ScrapeError> {
    let io_err = |source: std::io::Error| ScrapeError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, bytes).await.map_err(io_err)
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn save_table(&self, payload: &Payload) -> Result<PathBuf, ScrapeError> {
        let path = self.table_path();
        let rows = payload
            .rows()
            .map(|row| vec![row.facility, row.date, format_value(row.value)]);
        let bytes = encode_csv(&path, &TABLE_HEADER, rows)?;
        write_file(&path, &bytes).await?;
        Ok(path)
    }

    async fn save_snapshot(
        &self,
        snapshot: &Snapshot,
        screenshot_png: &[u8],
    ) -> Result<SnapshotArtifacts, ScrapeError> {
        let csv = self.snapshot_csv_path(snapshot.index);
        let rows = snapshot
            .rows()
            .map(|(label, value)| vec![label.to_string(), format_value(value)]);
        let bytes = encode_csv(&csv, &SNAPSHOT_HEADER, rows)?;
        write_file(&csv, &bytes).await?;

        let screenshot = self.screenshot_path(snapshot.index);
        write_file(&screenshot, screenshot_png).await?;

        tracing::info!(
            index = snapshot.index,
            csv = %csv.display(),
            screenshot = %screenshot.display(),
            "Snapshot persisted"
        );

        Ok(SnapshotArtifacts {
            index: snapshot.index,
            csv,
            screenshot,
        })
    }
}
