// Chart interaction controller - legend toggles the chart library will honor
use crate::application::page_driver::{ElementHandle, PageDriver};
use crate::error::{DriverError, ScrapeError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Dispatches the full pointer sequence at the element's center.
/// Plotly ignores a bare `.click()`, it redraws only after seeing this sequence.
pub const POINTER_SEQUENCE_SCRIPT: &str = r#"
    const el = arguments[0];
    const rect = el.getBoundingClientRect();
    const cx = Math.floor(rect.left + rect.width / 2);
    const cy = Math.floor(rect.top + rect.height / 2);
    const opts = {
        bubbles: true,
        cancelable: true,
        view: window,
        clientX: cx,
        clientY: cy
    };

    el.dispatchEvent(new MouseEvent('mouseover', opts));
    el.dispatchEvent(new PointerEvent('pointerover', opts));
    el.dispatchEvent(new MouseEvent('mousedown', opts));
    el.dispatchEvent(new PointerEvent('pointerdown', opts));
    el.dispatchEvent(new MouseEvent('mouseup', opts));
    el.dispatchEvent(new PointerEvent('pointerup', opts));
    el.dispatchEvent(new MouseEvent('click', opts));
"#;

#[async_trait]
pub trait Interaction: Send + Sync {
    fn name(&self) -> &'static str;

    async fn activate(
        &self,
        driver: &dyn PageDriver,
        element: ElementHandle,
    ) -> Result<(), DriverError>;
}

/// Scripted mouse/pointer event sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticPointerSequence;

#[async_trait]
impl Interaction for SyntheticPointerSequence {
    fn name(&self) -> &'static str {
        "synthetic pointer sequence"
    }

    async fn activate(
        &self,
        driver: &dyn PageDriver,
        element: ElementHandle,
    ) -> Result<(), DriverError> {
        driver.execute(POINTER_SEQUENCE_SCRIPT, &[element]).await?;
        Ok(())
    }
}

/// The driver's own move-and-click
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeClick;

#[async_trait]
impl Interaction for NativeClick {
    fn name(&self) -> &'static str {
        "native click"
    }

    async fn activate(
        &self,
        driver: &dyn PageDriver,
        element: ElementHandle,
    ) -> Result<(), DriverError> {
        driver.native_click(element).await
    }
}

/// Runs `primary`; if it fails, runs `fallback` once and reports only its result.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithFallback<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> WithFallback<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P: Interaction, F: Interaction> Interaction for WithFallback<P, F> {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn activate(
        &self,
        driver: &dyn PageDriver,
        element: ElementHandle,
    ) -> Result<(), DriverError> {
        match self.primary.activate(driver, element).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    "{} failed ({}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.activate(driver, element).await
            }
        }
    }
}

pub struct InteractionController {
    interaction: Box<dyn Interaction>,
    visible_timeout: Duration,
    poll_interval: Duration,
}

impl InteractionController {
    pub fn new(
        interaction: Box<dyn Interaction>,
        visible_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            interaction,
            visible_timeout,
            poll_interval,
        }
    }

    /// Synthetic pointer sequence, falling back to a native click
    pub fn standard(visible_timeout: Duration, poll_interval: Duration) -> Self {
        Self::new(
            Box::new(WithFallback::new(SyntheticPointerSequence, NativeClick)),
            visible_timeout,
            poll_interval,
        )
    }

    /// Wait for the element to be visible, then activate it
    pub async fn toggle(
        &self,
        driver: &dyn PageDriver,
        element: ElementHandle,
    ) -> Result<(), ScrapeError> {
        wait_until_visible(driver, element, self.visible_timeout, self.poll_interval).await?;
        self.interaction.activate(driver, element).await?;
        Ok(())
    }
}

pub async fn wait_until_visible(
    driver: &dyn PageDriver,
    element: ElementHandle,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), ScrapeError> {
    let deadline = Instant::now() + timeout;
    loop {
        if driver.is_displayed(element).await? {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(ScrapeError::Timeout {
                what: format!("element #{} to become visible", element.id()),
                waited: timeout,
            });
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}
