//! Request shapes and response mapping of the comment source

use crate::common::*;
use comment_sleuth::crawler::{build_http_client, CommentSource, RequestQueue, SourceError};
use comment_sleuth::CancelToken;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn make_source(server: &MockServer) -> (CommentSource, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let queue = RequestQueue::new(Duration::from_millis(1));
    let source = CommentSource::new(build_http_client().unwrap(), server.uri(), queue)
        .with_sink(sink.clone());
    (source, sink)
}

#[tokio::test]
async fn test_item_metadata_request_and_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("part", "snippet,statistics"))
        .and(query_param("id", CONTAINER))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": CONTAINER,
                "snippet": {
                    "title": "Opening Theme",
                    "thumbnails": {
                        "default": { "url": "https://img.example/d.jpg" },
                        "high": { "url": "https://img.example/h.jpg" }
                    }
                },
                "statistics": { "viewCount": "10", "commentCount": "42" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (source, sink) = make_source(&server).await;
    let meta = source
        .fetch_item_metadata(CONTAINER, &key(), &CancelToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(meta.container_id, CONTAINER);
    assert_eq!(meta.title, "Opening Theme");
    assert_eq!(meta.thumbnail_url, "https://img.example/h.jpg");
    assert_eq!(meta.total_comment_count, 42);
    assert_eq!(sink.events(), vec!["api_call:videos".to_string()]);
}

#[tokio::test]
async fn test_item_metadata_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let (source, _) = make_source(&server).await;
    let cancel = CancelToken::new();
    assert!(source
        .fetch_item_metadata("gone", &key(), &cancel)
        .await
        .unwrap()
        .is_none());
    assert!(source
        .fetch_item_metadata("empty", &key(), &cancel)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_thread_page_request_and_mapping() {
    let server = MockServer::start().await;
    thread_page(Some("abc"))
        .and(query_param("part", "snippet,replies"))
        .and(query_param("maxResults", "100"))
        .and(query_param("textFormat", "plainText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![
                thread_json(
                    "t1",
                    "what song is this?",
                    1,
                    vec![comment_json("t1.r1", "it's Blue Bird", 3, Some("t1"))],
                ),
                thread_json("t2", "[Naruto] OP 3", 5, vec![]),
            ],
            Some(""),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let (source, _) = make_source(&server).await;
    let page = source
        .fetch_thread_page(CONTAINER, &key(), Some("abc"), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(page.next_page_token, None, "empty token ends pagination");
    let ids: Vec<&str> = page.comments.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t1.r1", "t2"]);

    let t1 = &page.comments[0];
    assert_eq!(t1.reply_count, 1);
    assert!(t1.replies_fetched);
    assert_eq!(t1.score, 10);

    let reply = &page.comments[1];
    assert_eq!(reply.parent_id.as_deref(), Some("t1"));
    assert_eq!(reply.score, 50);
    assert_eq!(reply.like_count, 3);

    let t2 = &page.comments[2];
    assert_eq!(t2.reply_count, 5);
    assert!(!t2.replies_fetched);
    assert_eq!(t2.score, 40);
}

#[tokio::test]
async fn test_reply_page_request_and_mapping() {
    let server = MockServer::start().await;
    reply_page("t1", None)
        .and(query_param("part", "snippet"))
        .and(query_param("maxResults", "100"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![comment_json("t1.r1", "title: Blue Bird", 0, Some("t1"))],
            Some("next"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let (source, _) = make_source(&server).await;
    let page = source
        .fetch_reply_page("t1", CONTAINER, &key(), None, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(page.next_page_token.as_deref(), Some("next"));
    assert_eq!(page.comments.len(), 1);
    assert_eq!(page.comments[0].parent_id.as_deref(), Some("t1"));
    assert_eq!(page.comments[0].container_id, CONTAINER);
    assert_eq!(page.comments[0].score, 80);
}

#[tokio::test]
async fn test_error_classification() {
    let server = MockServer::start().await;
    reply_page("quota", None)
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "daily limit" }
        })))
        .mount(&server)
        .await;
    reply_page("broken", None)
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    reply_page("garbled", None)
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let (source, _) = make_source(&server).await;
    let cancel = CancelToken::new();

    match source
        .fetch_reply_page("quota", CONTAINER, &key(), None, &cancel)
        .await
    {
        Err(SourceError::QuotaExceeded { message }) => assert_eq!(message, "daily limit"),
        other => panic!("expected quota error, got {:?}", other),
    }

    match source
        .fetch_reply_page("broken", CONTAINER, &key(), None, &cancel)
        .await
    {
        Err(SourceError::Network { status, .. }) => assert_eq!(status, 502),
        other => panic!("expected network error, got {:?}", other),
    }

    assert!(matches!(
        source
            .fetch_reply_page("garbled", CONTAINER, &key(), None, &cancel)
            .await,
        Err(SourceError::Decode { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_request_is_never_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![], None)))
        .expect(0)
        .mount(&server)
        .await;

    let (source, sink) = make_source(&server).await;
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = source
        .fetch_thread_page(CONTAINER, &key(), None, &cancel)
        .await;
    assert!(matches!(result, Err(SourceError::Cancelled)));
    assert!(sink.events().is_empty());
}
