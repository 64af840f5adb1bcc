// Feed Fan-Out Pipeline - Write-time replication of posts into per-user feeds
//
// Post creation fans a post out to the author and every accepted friend;
// a friendship turning `accepted` backfills each party's recent posts into
// the other's feed. Both are best effort: individual feed writes may fail
// without failing the triggering write.

pub mod backfill;
pub mod fanout_engine;
pub mod friend_graph;
pub mod triggers;
pub mod write_batch;

pub use backfill::{is_acceptance_transition, BackfillEngine, BackfillReport, DirectionReport};
pub use fanout_engine::{FanoutEngine, FanoutReport};
pub use friend_graph::FriendGraph;
pub use triggers::FeedTriggers;
pub use write_batch::{FeedWriteBatch, WriteTally};

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::core::{Millis, UserId};
    use crate::error::{AppError, AppResult};
    use crate::infrastructure::database::{FeedRange, FeedStore, FriendshipStore, PostStore};
    use crate::infrastructure::SqliteDatabase;
    use crate::models::{FeedItem, Friendship, FriendshipRole, Post};

    /// Feed store that rejects writes for a fixed set of recipients.
    pub struct FlakyFeedStore {
        pub inner: Arc<SqliteDatabase>,
        pub failing_recipients: HashSet<UserId>,
    }

    #[async_trait]
    impl FeedStore for FlakyFeedStore {
        async fn put_feed_item(&self, recipient_id: &str, item: &FeedItem) -> AppResult<()> {
            if self.failing_recipients.contains(recipient_id) {
                return Err(AppError::DatabaseError(format!("injected failure for {}", recipient_id)));
            }
            self.inner.put_feed_item(recipient_id, item).await
        }

        async fn get_feed_item(&self, recipient_id: &str, post_id: &str) -> AppResult<Option<FeedItem>> {
            self.inner.get_feed_item(recipient_id, post_id).await
        }

        async fn list_feed_items(&self, recipient_id: &str, range: FeedRange) -> AppResult<Vec<FeedItem>> {
            self.inner.list_feed_items(recipient_id, range).await
        }

        async fn count_feed_items(&self, recipient_id: &str) -> AppResult<u64> {
            self.inner.count_feed_items(recipient_id).await
        }

        async fn delete_expired_feed_items(&self, now: Millis) -> AppResult<u64> {
            self.inner.delete_expired_feed_items(now).await
        }
    }

    /// Post store whose history lookups fail for a fixed set of authors.
    pub struct FailingPostStore {
        pub inner: Arc<SqliteDatabase>,
        pub failing_authors: HashSet<UserId>,
    }

    #[async_trait]
    impl PostStore for FailingPostStore {
        async fn create_post(&self, post: &Post) -> AppResult<()> {
            self.inner.create_post(post).await
        }

        async fn get_post(&self, id: &str) -> AppResult<Option<Post>> {
            self.inner.get_post(id).await
        }

        async fn recent_posts_by_author(&self, author_id: &str, limit: u32) -> AppResult<Vec<Post>> {
            if self.failing_authors.contains(author_id) {
                return Err(AppError::DatabaseError(format!("posts of {} unavailable", author_id)));
            }
            self.inner.recent_posts_by_author(author_id, limit).await
        }
    }

    /// Friendship store whose addressee-side query always fails.
    pub struct BrokenFriendshipStore;

    #[async_trait]
    impl FriendshipStore for BrokenFriendshipStore {
        async fn accepted_friend_ids(
            &self,
            _user_id: &str,
            role: FriendshipRole,
            _limit: u32,
        ) -> AppResult<Vec<UserId>> {
            match role {
                FriendshipRole::Requester => Ok(vec!["bob".to_string()]),
                FriendshipRole::Addressee => {
                    Err(AppError::DatabaseError("friendships index unavailable".to_string()))
                }
            }
        }

        async fn get_friendship(&self, _id: &str) -> AppResult<Option<Friendship>> {
            Ok(None)
        }

        async fn upsert_friendship(&self, _friendship: &Friendship) -> AppResult<Option<Friendship>> {
            Err(AppError::Internal("read-only store".to_string()))
        }

        async fn delete_friendship(&self, _id: &str) -> AppResult<Option<Friendship>> {
            Err(AppError::Internal("read-only store".to_string()))
        }
    }
}
