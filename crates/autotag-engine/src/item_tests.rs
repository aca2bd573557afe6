use std::sync::atomic::AtomicBool;

use super::*;
use crate::testutil::{test_config, FakeItem, FakePage};

async fn run_one(page: &FakePage, config: &Config) -> Result<Outcome, PageError> {
    let status = StatusBoard::new();
    let cancel = AtomicBool::new(false);
    let item = ItemHandle {
        node_id: 0,
        index: 0,
    };
    process_item(page, config, &status, &cancel, item).await
}

#[tokio::test]
async fn full_item_dispatches_nothing() {
    let mut item = FakeItem::new("Already Full", 10);
    item.panel_visible = true;
    item.suggestions = vec!["extra".to_string()];
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &test_config()).await.unwrap();

    assert_eq!(outcome, Outcome::Completed { tags: 10 });
    let state = page.state.lock();
    assert_eq!(state.items[0].accept_calls, 0);
    assert_eq!(state.items[0].click_calls, 0);
    assert_eq!(state.items[0].commit_calls, 0);
    assert!(state.items[0].processed);
}

#[tokio::test]
async fn bulk_accept_completes_item() {
    let mut item = FakeItem::new("Shopping Cart", 0);
    item.panel_visible = true;
    item.accept_adds = 10;
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &test_config()).await.unwrap();

    assert_eq!(outcome, Outcome::Completed { tags: 10 });
    let state = page.state.lock();
    assert_eq!(state.items[0].accept_calls, 1);
    assert!(state.items[0].processed);
}

#[tokio::test]
async fn ineffective_bulk_accept_gives_up_after_bounded_retries() {
    let mut item = FakeItem::new("Stubborn Card", 3);
    item.panel_visible = true;
    item.accept_adds = 0;
    let page = FakePage::new(vec![item]);
    let config = test_config();

    let outcome = run_one(&page, &config).await.unwrap();

    assert_eq!(outcome, Outcome::GaveUp { tags: 3 });
    let state = page.state.lock();
    // One first-pass attempt plus one per retry round.
    assert_eq!(
        state.items[0].accept_calls,
        1 + config.run.bulk_attempts as usize
    );
    assert_eq!(state.items[0].commit_calls, 0);
    assert!(state.items[0].processed);
}

#[tokio::test]
async fn seeds_title_keyword_when_no_suggestions_appear() {
    let mut item = FakeItem::new("Modern Flat Shopping Cart Icon", 0);
    item.commit_adds = true;
    item.panel_after_commit = true;
    item.accept_adds = 9;
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &test_config()).await.unwrap();

    assert_eq!(outcome, Outcome::Completed { tags: 10 });
    let state = page.state.lock();
    assert_eq!(state.items[0].commits[0], "shopping");
    assert_eq!(state.items[0].accept_calls, 1);
    assert!(state.items[0].processed);
}

#[tokio::test]
async fn seeding_alone_can_reach_the_target() {
    // The panel never appears; every tag comes from typed keywords.
    let mut item = FakeItem::new("Deep Blue Ocean Wave", 5);
    item.commit_adds = true;
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &test_config()).await.unwrap();

    assert_eq!(outcome, Outcome::Completed { tags: 10 });
    let state = page.state.lock();
    // First pass seeds the strongest keyword twice, the retry round walks
    // the derived keyword list until the card is full.
    assert_eq!(
        state.items[0].commits,
        vec!["ocean", "ocean", "deep", "blue", "ocean"]
    );
    assert_eq!(state.items[0].tags, 10);
}

#[tokio::test]
async fn overflow_is_trimmed_back_to_the_limit() {
    let mut item = FakeItem::new("Overflowing Card", 0);
    item.panel_visible = true;
    item.accept_adds = 12;
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &test_config()).await.unwrap();

    assert_eq!(outcome, Outcome::Completed { tags: 10 });
    let state = page.state.lock();
    assert_eq!(state.items[0].tags, 10);
    assert_eq!(state.items[0].remove_calls, 2);
}

#[tokio::test]
async fn refused_removal_stops_the_trim_loop() {
    let mut item = FakeItem::new("Sticky Tags", 0);
    item.panel_visible = true;
    item.accept_adds = 12;
    item.remove_works = false;
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &test_config()).await.unwrap();

    // Still counted as reaching the target; the overflow stays.
    assert_eq!(outcome, Outcome::Completed { tags: 12 });
    let state = page.state.lock();
    assert_eq!(state.items[0].remove_calls, 0);
    assert!(state.items[0].processed);
}

#[tokio::test]
async fn individual_clicks_fall_back_before_typing() {
    let mut config = test_config();
    config.run.bulk_only = false;
    let mut item = FakeItem::new("Clickable Card", 7);
    item.panel_visible = true;
    item.accept_adds = 0;
    item.click_adds = 3;
    item.suggestions = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &config).await.unwrap();

    assert_eq!(outcome, Outcome::Completed { tags: 10 });
    let state = page.state.lock();
    assert_eq!(state.items[0].click_calls, 1);
    assert_eq!(state.items[0].commit_calls, 0);
}

#[tokio::test]
async fn typed_entries_cap_at_remaining_capacity() {
    let mut config = test_config();
    config.run.bulk_only = false;
    let mut item = FakeItem::new("Typing Card", 7);
    item.panel_visible = true;
    item.accept_adds = 0;
    item.click_adds = 0;
    item.commit_adds = true;
    item.suggestions = vec![
        "alpha".to_string(),
        "beta".to_string(),
        "gamma".to_string(),
        "delta".to_string(),
    ];
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &config).await.unwrap();

    assert_eq!(outcome, Outcome::Completed { tags: 10 });
    let state = page.state.lock();
    // Three slots were free; the fourth suggestion is never typed.
    assert_eq!(state.items[0].commits, vec!["alpha", "beta", "gamma"]);
}

#[tokio::test]
async fn fallbacks_stay_off_in_bulk_only_mode() {
    let mut item = FakeItem::new("Bulk Only", 7);
    item.panel_visible = true;
    item.accept_adds = 0;
    item.click_adds = 3;
    item.commit_adds = true;
    item.suggestions = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let page = FakePage::new(vec![item]);

    let outcome = run_one(&page, &test_config()).await.unwrap();

    assert_eq!(outcome, Outcome::GaveUp { tags: 7 });
    let state = page.state.lock();
    assert_eq!(state.items[0].click_calls, 0);
    assert_eq!(state.items[0].commit_calls, 0);
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() {
    let mut item = FakeItem::new("Untouched", 0);
    item.panel_visible = true;
    item.accept_adds = 10;
    let page = FakePage::new(vec![item]);
    let config = test_config();
    let status = StatusBoard::new();
    let cancel = AtomicBool::new(true);

    let outcome = process_item(
        &page,
        &config,
        &status,
        &cancel,
        ItemHandle {
            node_id: 0,
            index: 0,
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    let state = page.state.lock();
    assert_eq!(state.items[0].accept_calls, 0);
    assert!(!state.items[0].processed);
}

#[tokio::test]
async fn page_failure_propagates_without_marking() {
    let mut item = FakeItem::new("Broken Card", 0);
    item.fail_tag_count = true;
    let page = FakePage::new(vec![item]);

    let result = run_one(&page, &test_config()).await;

    assert!(result.is_err());
    assert!(!page.state.lock().items[0].processed);
}
