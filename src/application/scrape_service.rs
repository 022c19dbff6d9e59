// Scrape service - drives one report from container lookup to per-legend snapshots
use crate::application::chart_reader::{read_chart, DEFAULT_SLICE_SELECTOR};
use crate::application::extractor::extract_embedded_values;
use crate::application::interaction::{Interaction, InteractionController};
use crate::application::locator::locate;
use crate::application::page_driver::{ElementHandle, PageDriver};
use crate::application::snapshot_store::{SnapshotArtifacts, SnapshotStore};
use crate::application::stabilizer::{
    StabilizationPoller, DEFAULT_POLL_INTERVAL, DEFAULT_STABILIZE_TIMEOUT,
};
use crate::domain::chart::{ChartReading, Snapshot};
use crate::domain::payload::Payload;
use crate::domain::selector::{LocatorStrategy, Selector};
use crate::error::ScrapeError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONTAINER_SELECTORS: [&str; 5] = [
    "div.gl-container",
    "div.plotly",
    "div.js-plotly-plot",
    "div.main-svg",
    "div#main",
];

pub const DEFAULT_HEADER_XPATHS: [&str; 4] = [
    "//*[contains(text(),'Last week loaded data')]",
    "//*[contains(text(),'Last week') and contains(text(),'data')]",
    "//*[contains(text(),'Facility Type') and contains(text(),'Average Time Spent')]",
    "//text[contains(.,'Last week')]",
];

pub const DEFAULT_CHART_SELECTOR: &str = "div.js-plotly-plot";
pub const DEFAULT_LEGEND_SELECTOR: &str = ".legendtoggle";
pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_VISIBLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub report_url: String,
    pub container: LocatorStrategy,
    pub header: LocatorStrategy,
    pub script: Selector,
    pub chart: Selector,
    pub legend_toggle: Selector,
    pub slice_selector: String,
    /// Abort when no header candidate matches
    pub require_header: bool,
    pub locate_timeout: Duration,
    pub visible_timeout: Duration,
    pub stabilize_timeout: Duration,
    pub poll_interval: Duration,
}

impl ScrapeOptions {
    pub fn new(report_url: impl Into<String>) -> Self {
        Self {
            report_url: report_url.into(),
            container: LocatorStrategy::new(
                "report container",
                DEFAULT_CONTAINER_SELECTORS.iter().map(|s| Selector::css(*s)).collect(),
            ),
            header: LocatorStrategy::new(
                "report header",
                DEFAULT_HEADER_XPATHS.iter().map(|s| Selector::xpath(*s)).collect(),
            ),
            script: Selector::tag_name("script"),
            chart: Selector::css(DEFAULT_CHART_SELECTOR),
            legend_toggle: Selector::css(DEFAULT_LEGEND_SELECTOR),
            slice_selector: DEFAULT_SLICE_SELECTOR.to_string(),
            require_header: true,
            locate_timeout: DEFAULT_LOCATE_TIMEOUT,
            visible_timeout: DEFAULT_VISIBLE_TIMEOUT,
            stabilize_timeout: DEFAULT_STABILIZE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    ContainerLocated,
    HeaderLocated,
    ScriptPresenceConfirmed,
    InitialDataExtracted,
    InitialDataValidated,
    InitialSnapshotPersisted,
    Interacting { item: usize },
    Stabilizing { item: usize },
    Persisted { item: usize },
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub item: usize,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub states: Vec<RunState>,
    pub header: Option<String>,
    pub table: Option<PathBuf>,
    pub table_rows: usize,
    pub legend_items: usize,
    pub snapshots: Vec<SnapshotArtifacts>,
    /// Legend items whose toggle left the chart values unchanged
    pub unchanged_items: Vec<usize>,
    pub item_failures: Vec<ItemFailure>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            states: vec![RunState::Init],
            header: None,
            table: None,
            table_rows: 0,
            legend_items: 0,
            snapshots: Vec::new(),
            unchanged_items: Vec::new(),
            item_failures: Vec::new(),
        }
    }

    fn enter(&mut self, state: RunState) {
        tracing::debug!(?state, "Run state");
        self.states.push(state);
    }

    pub fn state(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Init)
    }
}

/// A fatal error, with the last state reached and everything recorded up to it
#[derive(Debug, Error)]
#[error("scrape failed after {state:?}: {error}")]
pub struct RunFailure {
    pub state: RunState,
    #[source]
    pub error: ScrapeError,
    pub report: RunReport,
}

pub struct ScrapeService {
    driver: Arc<dyn PageDriver>,
    store: Arc<dyn SnapshotStore>,
    controller: InteractionController,
    poller: StabilizationPoller,
    options: ScrapeOptions,
}

impl ScrapeService {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        store: Arc<dyn SnapshotStore>,
        options: ScrapeOptions,
    ) -> Self {
        let controller =
            InteractionController::standard(options.visible_timeout, options.poll_interval);
        let poller = StabilizationPoller::new(
            options.slice_selector.clone(),
            options.stabilize_timeout,
            options.poll_interval,
        );
        Self {
            driver,
            store,
            controller,
            poller,
            options,
        }
    }

    /// Replace the legend interaction (the default is synthetic events with a native fallback)
    pub fn with_interaction(mut self, interaction: Box<dyn Interaction>) -> Self {
        self.controller = InteractionController::new(
            interaction,
            self.options.visible_timeout,
            self.options.poll_interval,
        );
        self
    }

    pub async fn run(&self) -> Result<RunReport, RunFailure> {
        let mut report = RunReport::new();

        let initial = match self.setup(&mut report).await {
            Ok(reading) => reading,
            Err(error) => return Err(Self::fail(report, error)),
        };

        if let Err(error) = self.process_legend(&mut report, initial).await {
            return Err(Self::fail(report, error));
        }

        report.enter(RunState::Done);
        report.finished_at = Some(Utc::now());
        Ok(report)
    }

    fn fail(mut report: RunReport, error: ScrapeError) -> RunFailure {
        let state = report.state();
        tracing::error!(?state, "Scrape aborted: {}", error);
        report.enter(RunState::Failed);
        report.finished_at = Some(Utc::now());
        RunFailure {
            state,
            error,
            report,
        }
    }

    /// Everything up to and including snapshot 0. Any error here is fatal.
    async fn setup(&self, report: &mut RunReport) -> Result<ChartReading, ScrapeError> {
        let driver = self.driver.as_ref();
        let opts = &self.options;

        tracing::info!(url = %opts.report_url, "Opening report");
        driver.goto(&opts.report_url).await?;

        locate(driver, &opts.container, opts.locate_timeout).await?;
        report.enter(RunState::ContainerLocated);

        match locate(driver, &opts.header, opts.locate_timeout).await {
            Ok(found) => {
                let title = driver.text(found.element).await?.trim().to_string();
                tracing::info!(title = %title, "Report header found");
                report.header = Some(title);
                report.enter(RunState::HeaderLocated);
            }
            Err(e) if !opts.require_header => {
                tracing::warn!("{}; continuing without a report header", e);
            }
            Err(e) => return Err(e),
        }

        if driver.wait_for(&opts.script, opts.locate_timeout).await?.is_none() {
            return Err(ScrapeError::NotFound {
                what: "<script> tag".to_string(),
                tried: vec![opts.script.to_string()],
            });
        }
        report.enter(RunState::ScriptPresenceConfirmed);

        let raw = extract_embedded_values(driver)
            .await?
            .ok_or(ScrapeError::NoData)?;
        report.enter(RunState::InitialDataExtracted);

        let payload = Payload::from_value(&raw)?;
        report.enter(RunState::InitialDataValidated);

        let table = self.store.save_table(&payload).await?;
        tracing::info!(path = %table.display(), rows = payload.len(), "Table data saved");
        report.table = Some(table);
        report.table_rows = payload.len();

        if driver.wait_for(&opts.chart, opts.locate_timeout).await?.is_some() {
            tracing::info!(selector = %opts.chart, "Doughnut chart container found");
        } else {
            tracing::warn!(selector = %opts.chart, "Doughnut chart container not found");
        }

        let reading = read_chart(driver, &opts.slice_selector).await?;
        let artifacts = self.persist(Snapshot::new(0, reading.clone())).await?;
        report.snapshots.push(artifacts);
        report.enter(RunState::InitialSnapshotPersisted);

        Ok(reading)
    }

    /// Toggle each legend item in turn. Per-item errors are recorded, not raised.
    async fn process_legend(
        &self,
        report: &mut RunReport,
        initial: ChartReading,
    ) -> Result<(), ScrapeError> {
        let count = self
            .driver
            .find_all(&self.options.legend_toggle)
            .await?
            .len();
        report.legend_items = count;
        tracing::info!("Legend items found: {}", count);

        let mut previous = initial;
        let mut next_index = 1;

        for item in 1..=count {
            match self.process_item(report, item, &previous, next_index).await {
                Ok((reading, artifacts)) => {
                    tracing::info!(item, index = artifacts.index, "Snapshot saved for filter");
                    report.snapshots.push(artifacts);
                    previous = reading;
                    next_index += 1;
                }
                Err(e) => {
                    tracing::error!(item, "Error applying filter #{}: {}", item, e);
                    report.item_failures.push(ItemFailure {
                        item,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    async fn process_item(
        &self,
        report: &mut RunReport,
        item: usize,
        previous: &ChartReading,
        index: usize,
    ) -> Result<(ChartReading, SnapshotArtifacts), ScrapeError> {
        let driver = self.driver.as_ref();

        report.enter(RunState::Interacting { item });
        let element = self.legend_item(item).await?;
        self.controller.toggle(driver, element).await?;

        report.enter(RunState::Stabilizing { item });
        let outcome = self
            .poller
            .wait_for_change(driver, Some(previous.values.as_slice()))
            .await?;
        if !outcome.changed() {
            tracing::info!(item, "Chart values did not change after toggling filter");
            report.unchanged_items.push(item);
        }

        let reading = outcome.into_reading();
        if reading.is_empty() {
            tracing::warn!(item, "No doughnut data found for filter #{}", item);
        }

        let artifacts = self.persist(Snapshot::new(index, reading.clone())).await?;
        report.enter(RunState::Persisted { item });
        Ok((reading, artifacts))
    }

    /// Legend handles go stale after every redraw, so look the item up again by position
    async fn legend_item(&self, item: usize) -> Result<ElementHandle, ScrapeError> {
        let legend = &self.options.legend_toggle;
        self.driver
            .find_all(legend)
            .await?
            .get(item - 1)
            .copied()
            .ok_or_else(|| ScrapeError::NotFound {
                what: format!("legend item #{item}"),
                tried: vec![legend.to_string()],
            })
    }

    async fn persist(&self, snapshot: Snapshot) -> Result<SnapshotArtifacts, ScrapeError> {
        if snapshot.reading.is_empty() {
            tracing::warn!(index = snapshot.index, "Snapshot has no chart data");
        }
        let png = self.driver.screenshot().await?;
        self.store.save_snapshot(&snapshot, &png).await
    }
}
