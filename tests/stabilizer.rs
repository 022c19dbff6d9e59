mod support;

use chart_scrape::application::interaction::{Interaction, NativeClick};
use chart_scrape::application::stabilizer::{Stabilization, StabilizationPoller};
use chart_scrape::domain::chart::ChartReading;
use chart_scrape::domain::selector::Selector;
use std::sync::atomic::Ordering;
use std::time::Duration;
use support::{FakeElement, FakePage};

fn poller(timeout: Duration) -> StabilizationPoller {
    StabilizationPoller::new(".js-plotly-plot g.slice", timeout, Duration::from_millis(200))
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_values_return_last_reading_after_timeout() {
    let page = FakePage::new().with_chart_states(&[&["Clinic 10", "Lab 20"]]);
    let previous = vec![Some(10.0), Some(20.0)];

    let start = tokio::time::Instant::now();
    let outcome = poller(Duration::from_secs(3))
        .wait_for_change(&page, Some(previous.as_slice()))
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(
        outcome,
        Stabilization::Unchanged(ChartReading::new(
            vec!["Clinic".to_string(), "Lab".to_string()],
            vec![Some(10.0), Some(20.0)],
        ))
    );
    // polled every 200ms, plus a final read at the deadline
    assert!(page.chart_reads.load(Ordering::SeqCst) >= 15);
}

#[tokio::test(start_paused = true)]
async fn test_change_is_returned_without_waiting_for_timeout() {
    let legend = Selector::css(".legendtoggle");
    let page = FakePage::new()
        .with(legend.clone(), FakeElement::visible())
        .with_chart_states(&[&["Clinic 10", "Lab 20"], &["Lab 20"]]);
    // one click moves the chart to its second state
    NativeClick
        .activate(&page, page.handles(&legend)[0])
        .await
        .unwrap();

    let start = tokio::time::Instant::now();
    let outcome = poller(Duration::from_secs(3))
        .wait_for_change(&page, Some(&[Some(10.0), Some(20.0)][..]))
        .await
        .unwrap();

    assert!(outcome.changed());
    assert_eq!(outcome.reading().values, vec![Some(20.0)]);
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_first_observation_counts_as_change() {
    let page = FakePage::new().with_chart_states(&[&["Clinic 10"]]);

    let outcome = poller(Duration::from_secs(3))
        .wait_for_change(&page, None)
        .await
        .unwrap();

    assert!(outcome.changed());
    assert_eq!(page.chart_reads.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_chart_is_a_valid_unchanged_outcome() {
    let page = FakePage::new();

    let outcome = poller(Duration::from_millis(500))
        .wait_for_change(&page, Some(&[][..]))
        .await
        .unwrap();

    assert!(!outcome.changed());
    assert!(outcome.reading().is_empty());
}
