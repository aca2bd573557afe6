use std::sync::Arc;

use super::*;
use crate::testutil::{test_config, FakeItem, FakePage};

fn happy_item(title: &str) -> FakeItem {
    let mut item = FakeItem::new(title, 0);
    item.panel_visible = true;
    item.accept_adds = 10;
    item
}

#[tokio::test]
async fn batch_processes_every_pending_item() {
    let items = (0..5).map(|i| happy_item(&format!("Item {i}"))).collect();
    let page = Arc::new(FakePage::new(items));
    let orchestrator = Orchestrator::new(page.clone(), test_config());

    let summary = orchestrator.run_batch().await.unwrap();

    assert_eq!(
        summary,
        BatchSummary {
            total: 5,
            done: 5,
            failed: 0,
            cancelled: false
        }
    );
    assert!(page.state.lock().items.iter().all(|i| i.processed));
    let status = orchestrator.snapshot();
    assert_eq!(status.total, 5);
    assert_eq!(status.done, 5);
}

#[tokio::test]
async fn already_processed_items_are_skipped() {
    let mut items: Vec<FakeItem> = (0..3).map(|i| happy_item(&format!("Item {i}"))).collect();
    items[1].processed = true;
    let page = Arc::new(FakePage::new(items));
    let orchestrator = Orchestrator::new(page.clone(), test_config());

    let summary = orchestrator.run_batch().await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.done, 2);
    assert_eq!(page.state.lock().items[1].accept_calls, 0);
}

#[tokio::test]
async fn empty_page_is_a_noop() {
    let page = Arc::new(FakePage::new(Vec::new()));
    let orchestrator = Orchestrator::new(page, test_config());

    let summary = orchestrator.run_batch().await.unwrap();

    assert_eq!(summary, BatchSummary::default());
}

#[tokio::test]
async fn cancellation_stops_before_the_next_group() {
    // Concurrency 2: items 0 and 1 form the first group. Item 1 trips the
    // cancel flag mid-group; the group still finishes, the next never starts.
    let mut items: Vec<FakeItem> = (0..4).map(|i| happy_item(&format!("Item {i}"))).collect();
    items[1].cancel_on_accept = true;
    let page = Arc::new(FakePage::new(items));
    let orchestrator = Orchestrator::new(page.clone(), test_config());
    page.state.lock().cancel_target = Some(orchestrator.cancel.clone());

    let summary = orchestrator.run_batch().await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.done, 2);
    let state = page.state.lock();
    assert!(state.items[0].processed);
    assert!(state.items[1].processed);
    assert!(!state.items[2].processed);
    assert!(!state.items[3].processed);
    assert_eq!(state.items[2].accept_calls, 0);
    assert_eq!(state.items[3].accept_calls, 0);
}

#[tokio::test]
async fn one_broken_item_does_not_abort_the_batch() {
    let mut config = test_config();
    config.run.concurrency = 1;
    let mut items: Vec<FakeItem> = (0..3).map(|i| happy_item(&format!("Item {i}"))).collect();
    items[1].fail_tag_count = true;
    let page = Arc::new(FakePage::new(items));
    let orchestrator = Orchestrator::new(page.clone(), config);

    let summary = orchestrator.run_batch().await.unwrap();

    assert_eq!(summary.done, 2);
    assert_eq!(summary.failed, 1);
    let state = page.state.lock();
    assert!(state.items[0].processed);
    assert!(!state.items[1].processed);
    assert!(state.items[2].processed);
}

#[tokio::test]
async fn giving_up_counts_as_failed() {
    let mut item = FakeItem::new("Never Fills", 2);
    item.panel_visible = true;
    item.accept_adds = 0;
    let page = Arc::new(FakePage::new(vec![item]));
    let orchestrator = Orchestrator::new(page.clone(), test_config());

    let summary = orchestrator.run_batch().await.unwrap();

    assert_eq!(summary.done, 0);
    assert_eq!(summary.failed, 1);
    // Gave-up items are still marked so a resume does not redo them.
    assert!(page.state.lock().items[0].processed);
    assert_eq!(orchestrator.snapshot().failed, 1);
}
