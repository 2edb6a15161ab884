//! Remote comment source
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client
//! - Item metadata, comment thread pages and reply pages
//! - Mapping responses into stored comments (scored on the way in)
//! - Error classification
//!
//! Every request goes through the shared [`RequestQueue`]; nothing here
//! retries.

use crate::analytics::{swallow, AnalyticsSink, NoopSink};
use crate::config::ValidatedKey;
use crate::crawler::queue::{QueueError, RequestQueue};
use crate::crawler::wire::{self, CommentThread, ListResponse, RemoteComment, VideoItem};
use crate::state::CancelToken;
use crate::storage::{Comment, ItemMetadata};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Page size requested for thread and reply listings
pub const PAGE_SIZE: u32 = 100;

const VIDEOS: &str = "videos";
const COMMENT_THREADS: &str = "commentThreads";
const COMMENTS: &str = "comments";

/// Errors from the remote source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("API quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("{endpoint} request failed with HTTP {status}: {message}")]
    Network {
        endpoint: &'static str,
        status: u16,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },

    #[error("Request cancelled before dispatch")]
    Cancelled,

    #[error("Request queue is closed")]
    QueueClosed,
}

impl SourceError {
    pub fn is_quota(&self) -> bool {
        matches!(self, SourceError::QuotaExceeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SourceError::Cancelled)
    }
}

impl From<QueueError> for SourceError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Cancelled => SourceError::Cancelled,
            QueueError::Closed => SourceError::QueueClosed,
        }
    }
}

/// One page of comments plus the token for the next one
#[derive(Debug, Clone, Default)]
pub struct CommentPage {
    pub comments: Vec<Comment>,

    /// None when this was the last page
    pub next_page_token: Option<String>,
}

/// A page of top-level comments, each followed by its inline replies
pub type ThreadPage = CommentPage;

/// A page of one thread's replies
pub type ReplyPage = CommentPage;

/// Builds the HTTP client used for every remote call
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!("comment-sleuth/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for the remote comment API
pub struct CommentSource {
    client: Client,
    base_url: String,
    queue: RequestQueue,
    sink: Arc<dyn AnalyticsSink>,
}

impl CommentSource {
    pub fn new(client: Client, base_url: impl Into<String>, queue: RequestQueue) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            queue,
            sink: Arc::new(NoopSink),
        }
    }

    /// Routes `record_api_call` events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Fetches title, thumbnail and comment count for an item
    ///
    /// # Returns
    ///
    /// * `Ok(Some(meta))` - The item exists; `scan_status` is idle
    /// * `Ok(None)` - The remote has no such item
    /// * `Err(SourceError)` - The request failed
    pub async fn fetch_item_metadata(
        &self,
        container_id: &str,
        key: &ValidatedKey,
        cancel: &CancelToken,
    ) -> Result<Option<ItemMetadata>, SourceError> {
        let params = vec![
            ("part", "snippet,statistics".to_string()),
            ("id", container_id.to_string()),
        ];
        let (status, body) = self
            .dispatch(VIDEOS, container_id, key, params, cancel)
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(VIDEOS, status, &body)?;

        let list: ListResponse<VideoItem> = decode(VIDEOS, &body)?;
        Ok(list
            .items
            .into_iter()
            .next()
            .map(|item| item.into_metadata(container_id)))
    }

    /// Fetches one page of comment threads
    pub async fn fetch_thread_page(
        &self,
        container_id: &str,
        key: &ValidatedKey,
        page_token: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<ThreadPage, SourceError> {
        let mut params = vec![
            ("part", "snippet,replies".to_string()),
            ("videoId", container_id.to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
            ("textFormat", "plainText".to_string()),
        ];
        push_token(&mut params, page_token);

        let (status, body) = self
            .dispatch(COMMENT_THREADS, container_id, key, params, cancel)
            .await?;
        check_status(COMMENT_THREADS, status, &body)?;

        let list: ListResponse<CommentThread> = decode(COMMENT_THREADS, &body)?;
        let next_page_token = list.continuation();
        let comments = list
            .items
            .into_iter()
            .flat_map(|thread| thread.into_comments(container_id))
            .collect::<Vec<_>>();

        tracing::debug!(
            container_id,
            comments = comments.len(),
            has_next = next_page_token.is_some(),
            "Fetched thread page"
        );

        Ok(ThreadPage {
            comments,
            next_page_token,
        })
    }

    /// Fetches one page of replies under `parent_id`
    pub async fn fetch_reply_page(
        &self,
        parent_id: &str,
        container_id: &str,
        key: &ValidatedKey,
        page_token: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<ReplyPage, SourceError> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("parentId", parent_id.to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
            ("textFormat", "plainText".to_string()),
        ];
        push_token(&mut params, page_token);

        let (status, body) = self
            .dispatch(COMMENTS, container_id, key, params, cancel)
            .await?;
        check_status(COMMENTS, status, &body)?;

        let list: ListResponse<RemoteComment> = decode(COMMENTS, &body)?;
        let next_page_token = list.continuation();
        let comments = list
            .items
            .into_iter()
            .map(|reply| reply.into_comment(container_id, Some(parent_id)))
            .collect::<Vec<_>>();

        tracing::debug!(
            container_id,
            parent_id,
            comments = comments.len(),
            has_next = next_page_token.is_some(),
            "Fetched reply page"
        );

        Ok(ReplyPage {
            comments,
            next_page_token,
        })
    }

    /// Queues one GET and returns its status and body
    async fn dispatch(
        &self,
        endpoint: &'static str,
        container_id: &str,
        key: &ValidatedKey,
        mut params: Vec<(&'static str, String)>,
        cancel: &CancelToken,
    ) -> Result<(StatusCode, String), SourceError> {
        params.push(("key", key.as_str().to_string()));

        let request = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&params);
        let sink = Arc::clone(&self.sink);
        let container_id = container_id.to_string();

        let outcome = self
            .queue
            .enqueue(cancel, async move {
                swallow("api_call", sink.record_api_call(endpoint, &container_id));
                let response = request.send().await?;
                let status = response.status();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>((status, body))
            })
            .await?;

        Ok(outcome?)
    }
}

fn push_token(params: &mut Vec<(&'static str, String)>, page_token: Option<&str>) {
    if let Some(token) = page_token.filter(|t| !t.is_empty()) {
        params.push(("pageToken", token.to_string()));
    }
}

/// Maps a non-success status to an error
fn check_status(endpoint: &'static str, status: StatusCode, body: &str) -> Result<(), SourceError> {
    if status.is_success() {
        return Ok(());
    }

    let message = wire::error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    if status == StatusCode::FORBIDDEN {
        tracing::error!(endpoint, %message, "API quota exhausted");
        return Err(SourceError::QuotaExceeded { message });
    }

    Err(SourceError::Network {
        endpoint,
        status: status.as_u16(),
        message,
    })
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Decode {
        endpoint,
        message: e.to_string(),
    })
}
