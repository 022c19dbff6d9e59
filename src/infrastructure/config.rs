use crate::application::chart_reader::DEFAULT_SLICE_SELECTOR;
use crate::application::scrape_service::{
    ScrapeOptions, DEFAULT_CHART_SELECTOR, DEFAULT_CONTAINER_SELECTORS, DEFAULT_HEADER_XPATHS,
    DEFAULT_LEGEND_SELECTOR,
};
use crate::domain::selector::{LocatorStrategy, Selector};
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CHART_SCRAPE";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub browser: BrowserSettings,
    pub report: ReportSettings,
    pub output: OutputSettings,
    pub timeouts: TimeoutSettings,
    pub selectors: SelectorSettings,
    pub run: RunSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            window_width: None,
            window_height: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportSettings {
    pub path: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("report.html"),
        }
    }
}

impl ReportSettings {
    /// `file://` URL of the report; the file has to exist
    pub fn url(&self) -> anyhow::Result<String> {
        let absolute = std::fs::canonicalize(&self.path)
            .with_context(|| format!("Report file {} not found", self.path.display()))?;
        let url = url::Url::from_file_path(&absolute)
            .map_err(|_| anyhow::anyhow!("Cannot build file URL for {}", absolute.display()))?;
        Ok(url.to_string())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputSettings {
    pub csv_dir: PathBuf,
    pub screenshot_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("csv"),
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutSettings {
    pub locate_ms: u64,
    pub visible_ms: u64,
    pub stabilize_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            locate_ms: 10_000,
            visible_ms: 10_000,
            stabilize_ms: 3_000,
            poll_interval_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectorSettings {
    /// CSS selectors, most specific first
    pub container: Vec<String>,
    /// XPath expressions, most specific first
    pub header: Vec<String>,
    pub chart: String,
    pub legend_toggle: String,
    pub slice_text: String,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER_SELECTORS.iter().map(|s| s.to_string()).collect(),
            header: DEFAULT_HEADER_XPATHS.iter().map(|s| s.to_string()).collect(),
            chart: DEFAULT_CHART_SELECTOR.to_string(),
            legend_toggle: DEFAULT_LEGEND_SELECTOR.to_string(),
            slice_text: DEFAULT_SLICE_SELECTOR.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunSettings {
    pub require_header: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            require_header: true,
        }
    }
}

impl Settings {
    pub fn scrape_options(&self, report_url: String) -> ScrapeOptions {
        let ms = Duration::from_millis;
        ScrapeOptions {
            report_url,
            container: LocatorStrategy::new(
                "report container",
                self.selectors.container.iter().map(Selector::css).collect(),
            ),
            header: LocatorStrategy::new(
                "report header",
                self.selectors.header.iter().map(Selector::xpath).collect(),
            ),
            script: Selector::tag_name("script"),
            chart: Selector::css(&self.selectors.chart),
            legend_toggle: Selector::css(&self.selectors.legend_toggle),
            slice_selector: self.selectors.slice_text.clone(),
            require_header: self.run.require_header,
            locate_timeout: ms(self.timeouts.locate_ms),
            visible_timeout: ms(self.timeouts.visible_ms),
            stabilize_timeout: ms(self.timeouts.stabilize_ms),
            poll_interval: ms(self.timeouts.poll_interval_ms),
        }
    }
}

/// Defaults, then `config/scraper.*` if present, then `CHART_SCRAPE__*` environment variables
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/scraper").required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
