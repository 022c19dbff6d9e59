// Resilient locator - ordered fallback over selector candidates
use crate::application::page_driver::{ElementHandle, PageDriver};
use crate::domain::selector::{LocatorStrategy, Selector};
use crate::error::ScrapeError;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub element: ElementHandle,
    pub selector: Selector,
}

/// Try each candidate in order, waiting up to `timeout` for each one.
/// Fails with `NotFound` only once every candidate has been exhausted.
pub async fn locate(
    driver: &dyn PageDriver,
    strategy: &LocatorStrategy,
    timeout: Duration,
) -> Result<Located, ScrapeError> {
    let mut tried = Vec::with_capacity(strategy.candidates().len());

    for selector in strategy.candidates() {
        tracing::debug!(what = strategy.what(), %selector, "Trying locator candidate");

        match driver.wait_for(selector, timeout).await {
            Ok(Some(element)) => {
                tracing::info!(what = strategy.what(), %selector, "Element located");
                return Ok(Located {
                    element,
                    selector: selector.clone(),
                });
            }
            Ok(None) => {
                tracing::debug!(what = strategy.what(), %selector, "Candidate timed out");
            }
            Err(e) => {
                // A broken candidate must not hide the ones after it
                tracing::warn!(what = strategy.what(), %selector, "Candidate failed: {}", e);
            }
        }
        tried.push(selector.to_string());
    }

    Err(ScrapeError::NotFound {
        what: strategy.what().to_string(),
        tried,
    })
}
