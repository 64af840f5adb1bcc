use serde::{Deserialize, Serialize};

use crate::core::{current_time_millis, Millis, PostId, UserId, FEED_ITEM_TTL_MS};
use crate::models::Post;

/// Per-recipient pointer to a post. Carries no post content: readers join
/// back to the post by `post_id` to render it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub post_id: PostId,
    pub author_id: UserId,
    pub created_at: Millis,
    pub expire_at: Millis,
}

impl FeedItem {
    /// Builds the feed projection of `post`, stamping posts that have no
    /// server-assigned creation time with the current wall clock.
    pub fn from_post(post: &Post) -> Self {
        Self::from_post_at(post, current_time_millis())
    }

    /// Same as [`FeedItem::from_post`] with the fallback clock supplied by the caller.
    pub fn from_post_at(post: &Post, fallback_now: Millis) -> Self {
        let created_at = post.created_at.unwrap_or(fallback_now);
        Self {
            post_id: post.id.clone(),
            author_id: post.author_id.clone(),
            created_at,
            expire_at: created_at + FEED_ITEM_TTL_MS,
        }
    }
}

/// One page of a recipient's feed, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
}
