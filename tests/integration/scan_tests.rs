//! End-to-end scans against a mock comment API

use crate::common::*;
use chrono::Utc;
use comment_sleuth::storage::{Comment, QueryDescriptor};
use comment_sleuth::{ScanMode, ScanStatus, SleuthError};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn ok(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// A pending top-level comment stored as if by an earlier run
fn stored_thread(id: &str, reply_count: u64, replies_fetched: bool) -> Comment {
    Comment {
        id: id.to_string(),
        parent_id: None,
        container_id: CONTAINER.to_string(),
        author_name: "someone".to_string(),
        author_avatar_url: String::new(),
        display_text: "nice".to_string(),
        original_text: "nice".to_string(),
        like_count: 0,
        reply_count,
        published_at: Utc::now(),
        pinned: false,
        replies_fetched,
        score: 0,
    }
}

/// Page 1: a promising thread with 3 replies (1 inline) and a plain thread
/// with 2 replies. Page 2: a promising thread whose only reply is inline.
async fn mount_two_pages(h: &Harness) {
    thread_page(None)
        .respond_with(ok(page_json(
            vec![
                thread_json(
                    "t1",
                    "song: Blue Bird",
                    3,
                    vec![comment_json("t1.r1", "thanks", 1, Some("t1"))],
                ),
                thread_json("t2", "great video", 2, vec![]),
            ],
            Some("p2"),
        )))
        .expect(1)
        .mount(&h.server)
        .await;

    thread_page(Some("p2"))
        .respond_with(ok(page_json(
            vec![thread_json(
                "t3",
                "it's Blue Bird",
                1,
                vec![comment_json("t3.r1", "yes", 0, Some("t3"))],
            )],
            None,
        )))
        .expect(1)
        .mount(&h.server)
        .await;
}

#[tokio::test]
async fn test_smart_scan_expands_only_promising_threads() {
    let h = harness().await;
    mount_two_pages(&h).await;

    reply_page("t1", None)
        .respond_with(ok(page_json(
            vec![
                comment_json("t1.r1", "thanks", 1, Some("t1")),
                comment_json("t1.r2", "[OP] Blue Bird", 4, Some("t1")),
                comment_json("t1.r3", "ok", 0, Some("t1")),
            ],
            None,
        )))
        .expect(1)
        .mount(&h.server)
        .await;

    reply_page("t2", None)
        .respond_with(ok(page_json(vec![], None)))
        .expect(0)
        .mount(&h.server)
        .await;

    let mut watch = h.store.watch(QueryDescriptor::Candidates {
        container_id: CONTAINER.to_string(),
        limit: 10,
    });
    assert!(watch.snapshot().unwrap().is_empty());

    let progress_total = AtomicU64::new(0);
    let state = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Smart, |n| {
            progress_total.fetch_add(n, Ordering::Relaxed);
        })
        .await
        .unwrap();

    assert_eq!(state.status, ScanStatus::Complete);
    assert_eq!(state.mode, Some(ScanMode::Smart));
    // Page 1 (3) + t1 replies (3) + page 2 (2); the re-sent inline reply counts again
    assert_eq!(state.fetched_count, 8);
    assert_eq!(progress_total.load(Ordering::Relaxed), 8);
    assert_eq!(h.controller.state(CONTAINER), state);

    let t1 = h.store.comment("t1").unwrap().unwrap();
    assert!(t1.replies_fetched);
    assert_eq!(t1.score, 80);
    assert_eq!(h.store.replies("t1").unwrap().len(), 3);

    // t3 had every reply inline, so it never needed expanding
    assert!(h.store.comment("t3").unwrap().unwrap().replies_fetched);

    let pending = h.store.unexpanded_threads(CONTAINER, None).unwrap();
    let pending: Vec<&str> = pending.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(pending, vec!["t2"]);

    let stats = h.store.container_stats(CONTAINER).unwrap();
    assert_eq!(stats.total_comments, 7);
    assert_eq!(stats.top_level, 3);

    let candidates = watch.next().await.unwrap().unwrap();
    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t3", "t1.r2"]);

    assert_eq!(h.sink.count("api_call:"), 3);
    assert_eq!(h.sink.count("scan_started:smart"), 1);
    assert_eq!(h.sink.count("scan_completed:smart:8"), 1);
    assert_eq!(h.sink.count("scan_error"), 0);
}

#[tokio::test]
async fn test_deep_scan_after_smart_skips_expanded_threads() {
    let h = harness().await;
    mount_two_pages(&h).await;

    reply_page("t1", None)
        .respond_with(ok(page_json(
            vec![comment_json("t1.r1", "thanks", 1, Some("t1"))],
            None,
        )))
        .expect(1)
        .mount(&h.server)
        .await;

    // t2's replies come back in two pages
    reply_page("t2", None)
        .respond_with(ok(page_json(
            vec![comment_json("t2.r1", "first", 0, Some("t2"))],
            Some("r-p2"),
        )))
        .expect(1)
        .mount(&h.server)
        .await;
    reply_page("t2", Some("r-p2"))
        .respond_with(ok(page_json(
            vec![comment_json("t2.r2", "second", 0, Some("t2"))],
            None,
        )))
        .expect(1)
        .mount(&h.server)
        .await;

    let smart = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Smart, |_| {})
        .await
        .unwrap();
    assert_eq!(smart.status, ScanStatus::Complete);

    let deep = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Deep, |_| {})
        .await
        .unwrap();
    assert_eq!(deep.status, ScanStatus::Complete);
    assert_eq!(deep.mode, Some(ScanMode::Deep));
    assert_eq!(deep.fetched_count, 2, "counter restarts with each run");

    assert!(h.store.comment("t2").unwrap().unwrap().replies_fetched);
    assert_eq!(h.store.replies("t2").unwrap().len(), 2);
    assert!(h.store.unexpanded_threads(CONTAINER, None).unwrap().is_empty());
}

#[tokio::test]
async fn test_deep_scan_skips_failed_thread_and_continues() {
    let h = harness().await;
    h.store
        .upsert_comments(&[stored_thread("t1", 2, false), stored_thread("t2", 1, false)])
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/commentThreads"))
        .respond_with(ok(page_json(vec![], None)))
        .expect(0)
        .mount(&h.server)
        .await;

    reply_page("t1", None)
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;
    reply_page("t2", None)
        .respond_with(ok(page_json(
            vec![comment_json("t2.r1", "hi", 0, Some("t2"))],
            None,
        )))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Deep, |_| {})
        .await
        .unwrap();

    assert_eq!(state.status, ScanStatus::Complete);
    assert!(state.error.is_none());
    assert!(!h.store.comment("t1").unwrap().unwrap().replies_fetched);
    assert!(h.store.comment("t2").unwrap().unwrap().replies_fetched);
    assert_eq!(h.sink.count("scan_error:t1"), 1);
}

#[tokio::test]
async fn test_smart_scan_does_not_retry_skipped_thread_in_same_run() {
    let h = harness().await;

    thread_page(None)
        .respond_with(ok(page_json(
            vec![thread_json("t1", "source: Blue Bird", 4, vec![])],
            Some("p2"),
        )))
        .mount(&h.server)
        .await;
    thread_page(Some("p2"))
        .respond_with(ok(page_json(vec![], None)))
        .mount(&h.server)
        .await;

    reply_page("t1", None)
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Smart, |_| {})
        .await
        .unwrap();

    assert_eq!(state.status, ScanStatus::Complete);
    assert!(!h.store.comment("t1").unwrap().unwrap().replies_fetched);
}

#[tokio::test]
async fn test_quota_exhaustion_fails_the_scan() {
    let h = harness().await;

    thread_page(None)
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "quotaExceeded" }
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Smart, |_| {})
        .await
        .unwrap();

    assert_eq!(state.status, ScanStatus::Error);
    assert!(state.error.as_deref().unwrap().contains("quota"));
    assert_eq!(h.sink.count("scan_error:-"), 1);
    assert_eq!(h.sink.count("scan_completed"), 0);
}

#[tokio::test]
async fn test_quota_during_expansion_is_fatal() {
    let h = harness().await;
    h.store
        .upsert_comments(&[stored_thread("t1", 2, false), stored_thread("t2", 1, false)])
        .unwrap();

    reply_page("t1", None)
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&h.server)
        .await;
    reply_page("t2", None)
        .respond_with(ok(page_json(vec![], None)))
        .expect(0)
        .mount(&h.server)
        .await;

    let state = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Deep, |_| {})
        .await
        .unwrap();

    assert_eq!(state.status, ScanStatus::Error);
    assert!(!h.store.comment("t2").unwrap().unwrap().replies_fetched);
}

#[tokio::test]
async fn test_thread_page_failure_halts_the_scan() {
    let h = harness().await;

    thread_page(None)
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Smart, |_| {})
        .await
        .unwrap();

    assert_eq!(state.status, ScanStatus::Error);
    assert!(state.error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_cancel_pauses_after_in_flight_request() {
    let h = harness().await;

    thread_page(None)
        .respond_with(
            ok(page_json(
                vec![thread_json("t1", "great video", 0, vec![])],
                Some("p2"),
            ))
            .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    thread_page(Some("p2"))
        .respond_with(ok(page_json(vec![], None)))
        .expect(0)
        .mount(&h.server)
        .await;

    let controller = h.controller.clone();
    let run = tokio::spawn(async move {
        controller
            .start(CONTAINER, &key(), ScanMode::Smart, |_| {})
            .await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.controller.cancel(CONTAINER));
    assert_eq!(h.controller.state(CONTAINER).status, ScanStatus::Paused);

    let state = run.await.unwrap().unwrap();
    assert_eq!(state.status, ScanStatus::Paused);

    // The in-flight page still landed
    assert!(h.store.comment("t1").unwrap().is_some());
    assert_eq!(state.fetched_count, 1);
    assert_eq!(h.sink.count("scan_paused:smart"), 1);
    assert_eq!(h.sink.count("scan_completed"), 0);
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let h = harness().await;

    thread_page(None)
        .respond_with(ok(page_json(vec![], None)).set_delay(Duration::from_millis(200)))
        .mount(&h.server)
        .await;

    let controller = h.controller.clone();
    let first = tokio::spawn(async move {
        controller
            .start(CONTAINER, &key(), ScanMode::Smart, |_| {})
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Deep, |_| {})
        .await;
    match second {
        Err(SleuthError::ScanInProgress { container_id }) => assert_eq!(container_id, CONTAINER),
        other => panic!("expected ScanInProgress, got {:?}", other),
    }

    let state = first.await.unwrap().unwrap();
    assert_eq!(state.status, ScanStatus::Complete);

    // Once released, the container can be scanned again
    let again = h
        .controller
        .start(CONTAINER, &key(), ScanMode::Smart, |_| {})
        .await
        .unwrap();
    assert_eq!(again.status, ScanStatus::Complete);
}

#[tokio::test]
async fn test_outcome_is_stamped_on_item_row() {
    let h = harness().await;

    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ok(json!({
            "items": [{
                "id": CONTAINER,
                "snippet": { "title": "Opening", "thumbnails": {} },
                "statistics": { "commentCount": "1" }
            }]
        })))
        .mount(&h.server)
        .await;
    thread_page(None)
        .respond_with(ok(page_json(
            vec![thread_json("t1", "hello", 0, vec![])],
            None,
        )))
        .mount(&h.server)
        .await;

    let meta = h.controller.load_item(CONTAINER, &key()).await.unwrap().unwrap();
    assert_eq!(meta.scan_status, ScanStatus::Idle);

    h.controller
        .start(CONTAINER, &key(), ScanMode::Smart, |_| {})
        .await
        .unwrap();

    let stored = h.store.item_metadata(CONTAINER).unwrap().unwrap();
    assert_eq!(stored.title, "Opening");
    assert_eq!(stored.scan_status, ScanStatus::Complete);
    assert!(stored.last_scanned_at.is_some());

    // Reloading details keeps the scan stamp
    let reloaded = h.controller.load_item(CONTAINER, &key()).await.unwrap().unwrap();
    assert_eq!(reloaded.scan_status, ScanStatus::Complete);
    assert_eq!(reloaded.last_scanned_at, stored.last_scanned_at);
}

#[tokio::test]
async fn test_missing_item_leaves_scan_state_alone() {
    let h = harness().await;

    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ok(json!({ "items": [] })))
        .mount(&h.server)
        .await;

    assert!(h.controller.load_item(CONTAINER, &key()).await.unwrap().is_none());
    assert!(h.store.item_metadata(CONTAINER).unwrap().is_none());
    assert_eq!(h.controller.state(CONTAINER).status, ScanStatus::Idle);
}
