// Error types shared by every layer
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a browser driver command
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("unknown or stale element handle #{0}")]
    StaleElement(usize),
    #[error("webdriver command failed: {0}")]
    Command(String),
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{what} not found (tried: {})", .tried.join(", "))]
    NotFound { what: String, tried: Vec<String> },

    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("no \"values\" payload found in any <script> tag")]
    NoData,

    #[error("invalid \"values\" structure, expected three non-empty arrays of equal length: {0}")]
    InvalidShape(String),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode CSV for {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
