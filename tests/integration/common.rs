//! Shared fixtures: a mock API server, a temp database and a recording sink

use comment_sleuth::analytics::{AnalyticsResult, AnalyticsSink};
use comment_sleuth::crawler::{build_http_client, CommentSource, RequestQueue, ScanSettings};
use comment_sleuth::{LocalStore, ScanController, ScanMode, ValidatedKey};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockBuilder, MockServer, Request};

pub const CONTAINER: &str = "v1";

/// Sink that keeps every event as a short string
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    fn push(&self, event: String) -> AnalyticsResult {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl AnalyticsSink for RecordingSink {
    fn record_api_call(&self, endpoint: &str, _container_id: &str) -> AnalyticsResult {
        self.push(format!("api_call:{}", endpoint))
    }

    fn record_comments_fetched(&self, _container_id: &str, count: u64) -> AnalyticsResult {
        self.push(format!("comments_fetched:{}", count))
    }

    fn record_scan_started(&self, _container_id: &str, mode: ScanMode) -> AnalyticsResult {
        self.push(format!("scan_started:{}", mode))
    }

    fn record_scan_completed(&self, _: &str, mode: ScanMode, fetched: u64) -> AnalyticsResult {
        self.push(format!("scan_completed:{}:{}", mode, fetched))
    }

    fn record_scan_paused(&self, _: &str, mode: ScanMode, fetched: u64) -> AnalyticsResult {
        self.push(format!("scan_paused:{}:{}", mode, fetched))
    }

    fn record_scan_error(&self, _: &str, thread_id: Option<&str>, _: &str) -> AnalyticsResult {
        self.push(format!("scan_error:{}", thread_id.unwrap_or("-")))
    }
}

/// Everything a scan test needs
pub struct Harness {
    pub server: MockServer,
    pub controller: ScanController,
    pub store: LocalStore,
    pub sink: Arc<RecordingSink>,
    _db_dir: TempDir,
}

pub async fn harness() -> Harness {
    let server = MockServer::start().await;
    let db_dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(&db_dir.path().join("sleuth.db")).unwrap();
    let sink = Arc::new(RecordingSink::default());

    let queue = RequestQueue::new(Duration::from_millis(5));
    let source = CommentSource::new(build_http_client().unwrap(), server.uri(), queue)
        .with_sink(sink.clone());
    let controller = ScanController::new(
        Arc::new(source),
        store.clone(),
        sink.clone(),
        ScanSettings::default(),
    );

    Harness {
        server,
        controller,
        store,
        sink,
        _db_dir: db_dir,
    }
}

pub fn key() -> ValidatedKey {
    ValidatedKey::new("test-key")
}

// ===== payloads =====

pub fn comment_json(id: &str, text: &str, likes: u64, parent: Option<&str>) -> Value {
    let mut snippet = json!({
        "authorDisplayName": format!("author-{}", id),
        "authorProfileImageUrl": format!("https://img.example/{}", id),
        "textDisplay": text,
        "textOriginal": text,
        "likeCount": likes,
        "publishedAt": "2024-03-01T10:00:00Z"
    });
    if let Some(parent) = parent {
        snippet["parentId"] = json!(parent);
    }
    json!({ "id": id, "snippet": snippet })
}

pub fn thread_json(id: &str, text: &str, total_replies: u64, inline: Vec<Value>) -> Value {
    json!({
        "id": id,
        "snippet": {
            "videoId": CONTAINER,
            "totalReplyCount": total_replies,
            "topLevelComment": comment_json(id, text, 0, None)
        },
        "replies": { "comments": inline }
    })
}

pub fn page_json(items: Vec<Value>, next: Option<&str>) -> Value {
    let mut page = json!({ "items": items });
    if let Some(token) = next {
        page["nextPageToken"] = json!(token);
    }
    page
}

// ===== mocks =====

/// Matches requests that carry no `pageToken`
pub struct FirstPage;

impl Match for FirstPage {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(k, _)| k == "pageToken")
    }
}

/// `commentThreads` request for one page of `CONTAINER`
pub fn thread_page(token: Option<&str>) -> MockBuilder {
    let builder = Mock::given(method("GET"))
        .and(path("/commentThreads"))
        .and(query_param("videoId", CONTAINER))
        .and(query_param("key", "test-key"));
    match token {
        Some(token) => builder.and(query_param("pageToken", token)),
        None => builder.and(FirstPage),
    }
}

/// `comments` request for one page of replies under `parent`
pub fn reply_page(parent: &str, token: Option<&str>) -> MockBuilder {
    let builder = Mock::given(method("GET"))
        .and(path("/comments"))
        .and(query_param("parentId", parent));
    match token {
        Some(token) => builder.and(query_param("pageToken", token)),
        None => builder.and(FirstPage),
    }
}
