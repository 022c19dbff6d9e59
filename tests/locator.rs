mod support;

use chart_scrape::application::locator::locate;
use chart_scrape::domain::selector::{LocatorStrategy, Selector};
use chart_scrape::error::ScrapeError;
use std::time::Duration;
use support::{FakeElement, FakePage};

fn container_strategy() -> LocatorStrategy {
    LocatorStrategy::new(
        "report container",
        vec![
            Selector::css("div.gl-container"),
            Selector::css("div.plotly"),
            Selector::css("div#main"),
        ],
    )
}

#[tokio::test]
async fn test_first_matching_candidate_wins() {
    let page = FakePage::new()
        .with(Selector::css("div.plotly"), FakeElement::visible())
        .with(Selector::css("div#main"), FakeElement::visible());

    let located = locate(&page, &container_strategy(), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(located.selector, Selector::css("div.plotly"));
    assert_eq!(located.element, page.handles(&Selector::css("div.plotly"))[0]);
    // candidates after the match are never tried
    assert_eq!(
        *page.waited.lock().unwrap(),
        vec![Selector::css("div.gl-container"), Selector::css("div.plotly")]
    );
}

#[tokio::test]
async fn test_broken_candidate_does_not_stop_fallback() {
    let page = FakePage::new()
        .with_broken_selector(Selector::css("div.gl-container"))
        .with(Selector::css("div#main"), FakeElement::visible());

    let located = locate(&page, &container_strategy(), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(located.selector, Selector::css("div#main"));
}

#[tokio::test]
async fn test_exhaustion_reports_every_candidate_in_order() {
    let page = FakePage::new();

    let err = locate(&page, &container_strategy(), Duration::from_secs(1))
        .await
        .unwrap_err();

    match err {
        ScrapeError::NotFound { what, tried } => {
            assert_eq!(what, "report container");
            assert_eq!(
                tried,
                vec!["css=div.gl-container", "css=div.plotly", "css=div#main"]
            );
        }
        other => panic!("expected NotFound, got {other}"),
    }
}
