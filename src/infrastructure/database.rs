// Store Interfaces - Async traits the fan-out pipeline reads and writes through
// Each backing store (SQLite here, a document database elsewhere) implements all three

use async_trait::async_trait;

use crate::core::{Millis, PostId, UserId};
use crate::error::AppResult;
use crate::models::{FeedItem, Friendship, FriendshipRole, Post};

/// Position of a feed item in newest-first order; the tiebreak on `post_id`
/// keeps pagination stable when several items share a `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPosition {
    pub created_at: Millis,
    pub post_id: PostId,
}

impl From<&FeedItem> for FeedPosition {
    fn from(item: &FeedItem) -> Self {
        Self {
            created_at: item.created_at,
            post_id: item.post_id.clone(),
        }
    }
}

/// Range query over one recipient's feed, ordered `created_at DESC, post_id DESC`.
#[derive(Debug, Clone)]
pub struct FeedRange {
    /// Only items strictly after this position (in feed order) are returned.
    pub after: Option<FeedPosition>,
    /// Items whose `expire_at` is before this instant are skipped.
    pub live_at: Millis,
    pub limit: u32,
}

/// Friendship edges. Read-only from the pipeline's point of view; the write
/// methods serve the collaborator that owns friend requests.
#[async_trait]
pub trait FriendshipStore: Send + Sync {
    /// Ids on the other end of `user_id`'s accepted edges where `user_id`
    /// occupies `role`.
    async fn accepted_friend_ids(
        &self,
        user_id: &str,
        role: FriendshipRole,
        limit: u32,
    ) -> AppResult<Vec<UserId>>;

    async fn get_friendship(&self, id: &str) -> AppResult<Option<Friendship>>;

    /// Create-or-update by id, returning the version that was replaced.
    async fn upsert_friendship(&self, friendship: &Friendship) -> AppResult<Option<Friendship>>;

    /// Delete by id, returning the deleted version.
    async fn delete_friendship(&self, id: &str) -> AppResult<Option<Friendship>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: &Post) -> AppResult<()>;

    async fn get_post(&self, id: &str) -> AppResult<Option<Post>>;

    /// Most recent live (not soft-deleted) posts of `author_id`, newest first.
    /// Posts without a creation time sort last.
    async fn recent_posts_by_author(&self, author_id: &str, limit: u32) -> AppResult<Vec<Post>>;
}

/// Per-recipient feed partitions, one document per post id.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Non-merging create-or-replace of `item` in `recipient_id`'s feed.
    async fn put_feed_item(&self, recipient_id: &str, item: &FeedItem) -> AppResult<()>;

    async fn get_feed_item(&self, recipient_id: &str, post_id: &str) -> AppResult<Option<FeedItem>>;

    async fn list_feed_items(&self, recipient_id: &str, range: FeedRange) -> AppResult<Vec<FeedItem>>;

    async fn count_feed_items(&self, recipient_id: &str) -> AppResult<u64>;

    /// Deletes every item (across all recipients) with `expire_at < now`.
    async fn delete_expired_feed_items(&self, now: Millis) -> AppResult<u64>;
}
