// WebDriver session backed by fantoccini
use crate::application::page_driver::{ElementHandle, PageDriver};
use crate::domain::selector::Selector;
use crate::error::DriverError;
use crate::infrastructure::config::BrowserSettings;
use anyhow::Context;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use futures::FutureExt;
use serde_json::{json, Value};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

impl From<CmdError> for DriverError {
    fn from(e: CmdError) -> Self {
        DriverError::Command(e.to_string())
    }
}

/// Elements handed out as `ElementHandle`s. The same element found again gets
/// its old handle back; navigation clears everything.
struct ElementRegistry<E> {
    entries: Vec<(Option<String>, E)>,
}

impl<E: Clone> ElementRegistry<E> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// `key` identifies the element on the remote end; `None` always registers anew.
    fn register(&mut self, key: Option<String>, element: E) -> ElementHandle {
        if let Some(key) = &key {
            let known = self
                .entries
                .iter()
                .position(|(existing, _)| existing.as_ref() == Some(key));
            if let Some(id) = known {
                return ElementHandle::new(id);
            }
        }
        self.entries.push((key, element));
        ElementHandle::new(self.entries.len() - 1)
    }

    fn get(&self, handle: ElementHandle) -> Option<E> {
        self.entries.get(handle.id()).map(|(_, e)| e.clone())
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// One browser session. Elements found through it are kept in a registry and
/// handed out as `ElementHandle`s.
pub struct WebDriverSession {
    client: Client,
    elements: Mutex<ElementRegistry<Element>>,
}

impl WebDriverSession {
    pub async fn connect(settings: &BrowserSettings) -> anyhow::Result<Self> {
        let url = settings.webdriver_url.trim_end_matches('/');
        if !Self::is_webdriver_running(url).await {
            anyhow::bail!(
                "Cannot reach WebDriver at {}. Start chromedriver first, e.g. `chromedriver --port 9515`",
                url
            );
        }

        let mut args = vec!["--no-sandbox".to_string()];
        if settings.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
            args.push("--disable-dev-shm-usage".to_string());
        }
        if let (Some(w), Some(h)) = (settings.window_width, settings.window_height) {
            args.push(format!("--window-size={},{}", w, h));
        }

        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        tracing::debug!("Connecting to WebDriver at {}", url);
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(url)
            .await
            .context("Failed to start WebDriver session")?;
        tracing::info!(headless = settings.headless, "WebDriver session started");

        Ok(Self {
            client,
            elements: Mutex::new(ElementRegistry::new()),
        })
    }

    async fn is_webdriver_running(url: &str) -> bool {
        match reqwest::get(format!("{}/status", url)).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("WebDriver status check failed: {}", e);
                false
            }
        }
    }

    /// End the session. Failures are logged; there is nothing left to clean up.
    pub async fn close(&self) {
        match self.client.clone().close().await {
            Ok(()) => tracing::info!("WebDriver session closed"),
            Err(e) => tracing::warn!("Failed to close WebDriver session: {}", e),
        }
    }

    async fn register(&self, element: Element) -> ElementHandle {
        // the W3C element reference is stable for as long as the node lives
        let key = serde_json::to_string(&element).ok();
        let mut elements = self.elements.lock().await;
        let handle = elements.register(key, element);
        tracing::trace!(registered = elements.len(), "Element handle {}", handle.id());
        handle
    }

    async fn element(&self, handle: ElementHandle) -> Result<Element, DriverError> {
        self.elements
            .lock()
            .await
            .get(handle)
            .ok_or(DriverError::StaleElement(handle.id()))
    }
}

fn locator(selector: &Selector) -> Locator<'_> {
    match selector {
        Selector::Css(css) => Locator::Css(css.as_str()),
        Selector::XPath(xpath) => Locator::XPath(xpath.as_str()),
        // a bare tag name is a valid CSS selector
        Selector::TagName(tag) => Locator::Css(tag.as_str()),
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.elements.lock().await.clear();
        self.client.goto(url).await?;
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let found = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(locator(selector))
            .await;

        match found {
            Ok(element) => Ok(Some(self.register(element).await)),
            Err(CmdError::WaitTimeout) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError> {
        let found = self.client.find_all(locator(selector)).await?;
        let mut handles = Vec::with_capacity(found.len());
        for element in found {
            handles.push(self.register(element).await);
        }
        Ok(handles)
    }

    async fn inner_html(&self, element: ElementHandle) -> Result<String, DriverError> {
        Ok(self.element(element).await?.html(true).await?)
    }

    async fn text(&self, element: ElementHandle) -> Result<String, DriverError> {
        Ok(self.element(element).await?.text().await?)
    }

    async fn is_displayed(&self, element: ElementHandle) -> Result<bool, DriverError> {
        Ok(self.element(element).await?.is_displayed().await?)
    }

    async fn execute(&self, script: &str, args: &[ElementHandle]) -> Result<Value, DriverError> {
        let mut script_args = Vec::with_capacity(args.len());
        for handle in args {
            let element = self.element(*handle).await?;
            let arg = serde_json::to_value(&element)
                .map_err(|e| DriverError::Script(format!("cannot pass element: {}", e)))?;
            script_args.push(arg);
        }

        self.client
            .execute(script, script_args)
            .await
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    async fn native_click(&self, element: ElementHandle) -> Result<(), DriverError> {
        let element = self.element(element).await?;
        element.click().await?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(self.client.screenshot().await?)
    }
}

/// Open a session, run `job` against it and close the session on every exit path,
/// including a panic in `job` or Ctrl-C.
pub async fn with_session<F, Fut, T>(settings: &BrowserSettings, job: F) -> anyhow::Result<T>
where
    F: FnOnce(Arc<dyn PageDriver>) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let session = Arc::new(WebDriverSession::connect(settings).await?);
    let driver: Arc<dyn PageDriver> = session.clone();
    run_then_close(job(driver), || session.close()).await
}

async fn run_then_close<T, Fut, C, CFut>(job: Fut, close: C) -> anyhow::Result<T>
where
    Fut: Future<Output = anyhow::Result<T>>,
    C: FnOnce() -> CFut,
    CFut: Future<Output = ()>,
{
    let outcome = tokio::select! {
        outcome = AssertUnwindSafe(job).catch_unwind() => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };

    close().await;

    match outcome {
        Some(Ok(result)) => result,
        Some(Err(payload)) => panic::resume_unwind(payload),
        None => anyhow::bail!("Interrupted, WebDriver session closed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_session_closed_after_job_returns() {
        let closes = AtomicUsize::new(0);
        let result = run_then_close(async { Ok(7) }, || async {
            closes.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_closed_after_job_error() {
        let closes = AtomicUsize::new(0);
        let result: anyhow::Result<()> =
            run_then_close(async { Err(anyhow::anyhow!("job failed")) }, || async {
                closes.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "job failed");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_closed_when_job_panics() {
        let closes = AtomicUsize::new(0);
        let run = run_then_close(
            async {
                if closes.load(Ordering::SeqCst) == 0 {
                    panic!("job panicked");
                }
                Ok(())
            },
            || async {
                closes.fetch_add(1, Ordering::SeqCst);
            },
        );

        let outcome = AssertUnwindSafe(run).catch_unwind().await;

        assert!(outcome.is_err(), "panic must be resumed after closing");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_reuses_handles_for_known_elements() {
        let mut registry = ElementRegistry::new();
        let first = registry.register(Some("el-1".to_string()), "legend 1");
        let second = registry.register(Some("el-2".to_string()), "legend 2");

        // the legend is looked up again after every redraw
        for _ in 0..5 {
            assert_eq!(registry.register(Some("el-1".to_string()), "legend 1"), first);
            assert_eq!(registry.register(Some("el-2".to_string()), "legend 2"), second);
        }

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(second), Some("legend 2"));
    }

    #[test]
    fn test_registry_clear_makes_handles_stale() {
        let mut registry = ElementRegistry::new();
        let handle = registry.register(None, "container");
        let again = registry.register(None, "container");
        assert_ne!(handle, again);

        registry.clear();

        assert_eq!(registry.get(handle), None);
        assert_eq!(registry.len(), 0);
    }
}
