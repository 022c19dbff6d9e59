// Main entry point - Configuration, session lifecycle and the scrape run
use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use chart_scrape::application::scrape_service::ScrapeService;
use chart_scrape::infrastructure::config::load_settings;
use chart_scrape::infrastructure::fs_store::FsSnapshotStore;
use chart_scrape::infrastructure::webdriver::with_session;
use chart_scrape::presentation::console::report_outcome;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings().context("Failed to load configuration")?;
    let report_url = settings.report.url()?;
    let options = settings.scrape_options(report_url);
    let store = Arc::new(FsSnapshotStore::from_settings(&settings.output));

    // The session is closed before the outcome is inspected
    let outcome = with_session(&settings.browser, |driver| async move {
        let service = ScrapeService::new(driver, store, options);
        Ok::<_, anyhow::Error>(service.run().await)
    })
    .await?;

    // A failed run is already reported on stderr; only the exit status is left
    Ok(report_outcome(&outcome))
}
