//! Health articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

text_enum!(PostStatus, "post status", {
    Draft => "draft",
    Published => "published",
});

/// An article on a health topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    /// URL-safe unique identifier derived from the title
    pub slug: String,
    /// Short summary for listings
    pub excerpt: String,
    /// Markdown body
    pub body: String,
    pub topic: String,
    /// Caller who created the post
    pub author: String,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Create a new draft.
    pub fn draft(
        title: String,
        slug: String,
        excerpt: String,
        body: String,
        topic: String,
        author: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            slug,
            excerpt,
            body,
            topic,
            author,
            status: PostStatus::Draft,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}
