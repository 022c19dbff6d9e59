// Browser page trait - everything the scraper needs from a driver
use crate::domain::selector::Selector;
use crate::error::DriverError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Opaque reference to an element found on the current page.
/// Handles go stale when the page re-renders; re-locate instead of caching them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(usize);

impl ElementHandle {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn id(&self) -> usize {
        self.0
    }
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate the session to `url`
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Wait up to `timeout` for an element matching `selector`.
    /// `Ok(None)` means the wait timed out.
    async fn wait_for(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>, DriverError>;

    /// All elements currently matching `selector`, in document order
    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError>;

    async fn inner_html(&self, element: ElementHandle) -> Result<String, DriverError>;

    async fn text(&self, element: ElementHandle) -> Result<String, DriverError>;

    async fn is_displayed(&self, element: ElementHandle) -> Result<bool, DriverError>;

    /// Run a script in the page; `args` are available as `arguments[i]`
    async fn execute(&self, script: &str, args: &[ElementHandle]) -> Result<Value, DriverError>;

    /// Move to the element and click it with the driver's own input primitive
    async fn native_click(&self, element: ElementHandle) -> Result<(), DriverError>;

    /// Full-page PNG capture
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;
}
