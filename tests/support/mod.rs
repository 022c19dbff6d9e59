// Scripted in-memory page used by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chart_scrape::application::interaction::POINTER_SEQUENCE_SCRIPT;
use chart_scrape::application::page_driver::{ElementHandle, PageDriver};
use chart_scrape::domain::selector::Selector;
use chart_scrape::error::DriverError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub html: String,
    pub text: String,
    pub displayed: bool,
}

impl FakeElement {
    pub fn visible() -> Self {
        Self {
            displayed: true,
            ..Self::default()
        }
    }

    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn with_html(html: &str) -> Self {
        Self {
            html: html.to_string(),
            displayed: true,
            ..Self::default()
        }
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            displayed: true,
            ..Self::default()
        }
    }
}

/// A page whose chart advances to the next configured state after every
/// successful legend activation.
#[derive(Default)]
pub struct FakePage {
    elements: Vec<FakeElement>,
    matches: HashMap<Selector, Vec<ElementHandle>>,
    failing_selectors: Vec<Selector>,
    chart_states: Vec<Vec<String>>,
    clicks: AtomicUsize,
    synthetic_fails: bool,
    native_fails: bool,
    pub synthetic_calls: AtomicUsize,
    pub native_clicks: AtomicUsize,
    pub chart_reads: AtomicUsize,
    pub screenshots: AtomicUsize,
    pub waited: Mutex<Vec<Selector>>,
    pub visited: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: Selector, element: FakeElement) -> Self {
        let handle = ElementHandle::new(self.elements.len());
        self.elements.push(element);
        self.matches.entry(selector).or_default().push(handle);
        self
    }

    pub fn with_broken_selector(mut self, selector: Selector) -> Self {
        self.failing_selectors.push(selector);
        self
    }

    /// Slice texts per chart state; state N is shown after N activations
    pub fn with_chart_states(mut self, states: &[&[&str]]) -> Self {
        self.chart_states = states
            .iter()
            .map(|s| s.iter().map(|t| t.to_string()).collect())
            .collect();
        self
    }

    pub fn failing_synthetic_events(mut self) -> Self {
        self.synthetic_fails = true;
        self
    }

    pub fn failing_native_clicks(mut self) -> Self {
        self.native_fails = true;
        self
    }

    pub fn handles(&self, selector: &Selector) -> Vec<ElementHandle> {
        self.matches.get(selector).cloned().unwrap_or_default()
    }

    fn element(&self, handle: ElementHandle) -> Result<&FakeElement, DriverError> {
        self.elements
            .get(handle.id())
            .ok_or(DriverError::StaleElement(handle.id()))
    }

    fn current_chart(&self) -> Value {
        if self.chart_states.is_empty() {
            return json!([]);
        }
        let state = self
            .clicks
            .load(Ordering::SeqCst)
            .min(self.chart_states.len() - 1);
        json!(self.chart_states[state])
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &Selector,
        _timeout: Duration,
    ) -> Result<Option<ElementHandle>, DriverError> {
        self.waited.lock().unwrap().push(selector.clone());
        if self.failing_selectors.contains(selector) {
            return Err(DriverError::Command(format!("invalid selector {selector}")));
        }
        Ok(self.handles(selector).first().copied())
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError> {
        Ok(self.handles(selector))
    }

    async fn inner_html(&self, element: ElementHandle) -> Result<String, DriverError> {
        Ok(self.element(element)?.html.clone())
    }

    async fn text(&self, element: ElementHandle) -> Result<String, DriverError> {
        Ok(self.element(element)?.text.clone())
    }

    async fn is_displayed(&self, element: ElementHandle) -> Result<bool, DriverError> {
        Ok(self.element(element)?.displayed)
    }

    async fn execute(&self, script: &str, args: &[ElementHandle]) -> Result<Value, DriverError> {
        if script == POINTER_SEQUENCE_SCRIPT {
            self.synthetic_calls.fetch_add(1, Ordering::SeqCst);
            if self.synthetic_fails {
                return Err(DriverError::Script("PointerEvent is not defined".to_string()));
            }
            for handle in args {
                self.element(*handle)?;
            }
            self.clicks.fetch_add(1, Ordering::SeqCst);
            return Ok(Value::Null);
        }
        if script.contains("g.slicetext text") {
            self.chart_reads.fetch_add(1, Ordering::SeqCst);
            return Ok(self.current_chart());
        }
        Err(DriverError::Script(format!("unexpected script: {script}")))
    }

    async fn native_click(&self, element: ElementHandle) -> Result<(), DriverError> {
        self.element(element)?;
        self.native_clicks.fetch_add(1, Ordering::SeqCst);
        if self.native_fails {
            return Err(DriverError::Command("element click intercepted".to_string()));
        }
        self.clicks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }
}
