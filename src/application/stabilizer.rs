// Stabilization poller - waits for an asynchronous chart redraw to land
use crate::application::chart_reader::read_chart;
use crate::application::page_driver::PageDriver;
use crate::domain::chart::ChartReading;
use crate::error::ScrapeError;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_STABILIZE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How a poll ended. Errors are the third exit and travel through `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stabilization {
    Changed(ChartReading),
    /// Timeout elapsed without a change; carries the last reading seen
    Unchanged(ChartReading),
}

impl Stabilization {
    pub fn changed(&self) -> bool {
        matches!(self, Stabilization::Changed(_))
    }

    pub fn reading(&self) -> &ChartReading {
        match self {
            Stabilization::Changed(r) | Stabilization::Unchanged(r) => r,
        }
    }

    pub fn into_reading(self) -> ChartReading {
        match self {
            Stabilization::Changed(r) | Stabilization::Unchanged(r) => r,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StabilizationPoller {
    slice_selector: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl StabilizationPoller {
    pub fn new(slice_selector: impl Into<String>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            slice_selector: slice_selector.into(),
            timeout,
            poll_interval,
        }
    }

    /// Re-read the chart until its values differ from `previous` or the timeout elapses.
    /// With no previous values the first reading counts as a change.
    pub async fn wait_for_change(
        &self,
        driver: &dyn PageDriver,
        previous: Option<&[Option<f64>]>,
    ) -> Result<Stabilization, ScrapeError> {
        let deadline = Instant::now() + self.timeout;
        let mut polls = 0usize;

        loop {
            let reading = read_chart(driver, &self.slice_selector).await?;
            polls += 1;

            let differs = match previous {
                None => true,
                Some(prev) => reading.values.as_slice() != prev,
            };
            if differs {
                tracing::debug!(polls, "Chart data changed");
                return Ok(Stabilization::Changed(reading));
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(polls, "Chart data unchanged after {:?}", self.timeout);
                return Ok(Stabilization::Unchanged(reading));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
