use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: i64,
    pub poll_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// None for a top-level comment, otherwise the direct parent in the
    /// same poll. The parent may itself already be deleted.
    pub parent_id: Option<i64>,
}

/// One page of a poll's comment forest, fetched one depth level at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub items: Vec<Comment>,
    pub total: i64,
    pub has_more: bool,
    pub next_offset: i64,
}

impl CommentPage {
    pub fn new(items: Vec<Comment>, total: i64, offset: i64) -> Self {
        let next_offset = offset + items.len() as i64;
        Self {
            items,
            total,
            has_more: next_offset < total,
            next_offset,
        }
    }
}
