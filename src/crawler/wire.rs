//! Response bodies of the remote comment API
//!
//! Only the fields the crawler reads are modelled; everything else in the
//! payload is ignored by serde.

use crate::scoring::analyze;
use crate::state::ScanStatus;
use crate::storage::{Comment, ItemMetadata};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A paginated list envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl<T> ListResponse<T> {
    /// The continuation token, with empty strings treated as absent
    pub fn continuation(&self) -> Option<String> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }
}

// ===== videos =====

#[derive(Debug, Deserialize)]
pub struct VideoItem {
    #[serde(default)]
    pub snippet: Option<VideoSnippet>,

    #[serde(default)]
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub high: Option<Thumbnail>,

    #[serde(default)]
    pub medium: Option<Thumbnail>,

    #[serde(default, rename = "default")]
    pub fallback: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    /// Sent as a decimal string
    #[serde(default)]
    pub comment_count: Option<String>,
}

impl VideoItem {
    pub fn into_metadata(self, container_id: &str) -> ItemMetadata {
        let snippet = self.snippet.unwrap_or_default();
        let thumbnails = snippet.thumbnails;
        let thumbnail_url = thumbnails
            .high
            .or(thumbnails.medium)
            .or(thumbnails.fallback)
            .map(|t| t.url)
            .unwrap_or_default();

        let total_comment_count = self
            .statistics
            .and_then(|s| s.comment_count)
            .and_then(|count| count.trim().parse::<u64>().ok())
            .unwrap_or(0);

        ItemMetadata {
            container_id: container_id.to_string(),
            title: snippet.title,
            thumbnail_url,
            total_comment_count,
            last_scanned_at: None,
            scan_status: ScanStatus::Idle,
        }
    }
}

// ===== commentThreads / comments =====

#[derive(Debug, Deserialize)]
pub struct CommentThread {
    pub snippet: ThreadSnippet,

    #[serde(default)]
    pub replies: Option<ThreadReplies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnippet {
    pub top_level_comment: RemoteComment,

    #[serde(default)]
    pub total_reply_count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThreadReplies {
    #[serde(default)]
    pub comments: Vec<RemoteComment>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteComment {
    pub id: String,
    pub snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default)]
    pub author_display_name: String,

    #[serde(default)]
    pub author_profile_image_url: String,

    #[serde(default)]
    pub text_display: String,

    #[serde(default)]
    pub text_original: Option<String>,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub like_count: u64,

    pub published_at: DateTime<Utc>,
}

impl RemoteComment {
    /// Maps to a stored comment and scores it
    ///
    /// `parent_id` wins over the snippet's own `parentId` when given.
    pub fn into_comment(self, container_id: &str, parent_id: Option<&str>) -> Comment {
        let snippet = self.snippet;
        let original_text = snippet
            .text_original
            .unwrap_or_else(|| snippet.text_display.clone());
        let score = analyze(&original_text).score;

        Comment {
            id: self.id,
            parent_id: parent_id.map(str::to_string).or(snippet.parent_id),
            container_id: container_id.to_string(),
            author_name: snippet.author_display_name,
            author_avatar_url: snippet.author_profile_image_url,
            display_text: snippet.text_display,
            original_text,
            like_count: snippet.like_count,
            reply_count: 0,
            published_at: snippet.published_at,
            pinned: false,
            replies_fetched: false,
            score,
        }
    }
}

impl CommentThread {
    /// Flattens a thread into its top-level comment followed by inline replies
    pub fn into_comments(self, container_id: &str) -> Vec<Comment> {
        let inline = self.replies.unwrap_or_default().comments;
        let total_replies = self.snippet.total_reply_count;

        let mut top = self
            .snippet
            .top_level_comment
            .into_comment(container_id, None);
        top.parent_id = None;
        top.reply_count = total_replies;
        top.replies_fetched = inline.len() as u64 >= total_replies;

        let mut comments = Vec::with_capacity(inline.len() + 1);
        let parent_id = top.id.clone();
        comments.push(top);
        comments.extend(
            inline
                .into_iter()
                .map(|reply| reply.into_comment(container_id, Some(&parent_id))),
        );
        comments
    }
}

// ===== errors =====

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Best human-readable message for an error response body
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
}
