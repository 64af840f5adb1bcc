#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use feed_fanout::{
    config::FanoutConfig,
    core::{Millis, UserId},
    error::{AppError, AppResult},
    fanout::FeedTriggers,
    infrastructure::{FeedRange, FeedStore, FriendshipStore, PipelineMetrics, PostStore, SqliteDatabase},
    models::{FeedItem, Friendship, FriendshipStatus, Post},
};

/// Feed store wrapper that fails every write addressed to `failing_recipients`.
pub struct FlakyFeedStore {
    pub inner: Arc<SqliteDatabase>,
    pub failing_recipients: HashSet<UserId>,
}

#[async_trait]
impl FeedStore for FlakyFeedStore {
    async fn put_feed_item(&self, recipient_id: &str, item: &FeedItem) -> AppResult<()> {
        if self.failing_recipients.contains(recipient_id) {
            return Err(AppError::DatabaseError(format!("write to {} dropped", recipient_id)));
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

pub async fn memory_db() -> Arc<SqliteDatabase> {
    Arc::new(SqliteDatabase::new_in_memory().await.unwrap())
}

pub fn triggers_over(db: &Arc<SqliteDatabase>, feeds: Arc<dyn FeedStore>) -> FeedTriggers {
    FeedTriggers::new(
        db.clone(),
        db.clone(),
        feeds,
        &FanoutConfig::default(),
        PipelineMetrics::new(),
    )
}

pub async fn befriend(db: &SqliteDatabase, id: &str, requester: &str, addressee: &str) {
    db.upsert_friendship(&Friendship::new(id, requester, addressee, FriendshipStatus::Accepted))
        .await
        .unwrap();
}

/// Commits `count` posts by `author`, one minute apart, oldest first, ending at `newest`.
pub async fn seed_posts(db: &SqliteDatabase, author: &str, count: i64, newest: Millis) -> Vec<Post> {
    let mut posts = Vec::new();
    for i in 0..count {
        let post = Post::new(
            format!("{}-{:03}", author, i),
            author,
            Some(newest - (count - 1 - i) * 60_000),
        );
        db.create_post(&post).await.unwrap();
        posts.push(post);
    }
    posts
}

pub async fn feed_ids(db: &SqliteDatabase, recipient: &str) -> Vec<String> {
    db.list_feed_items(
        recipient,
        FeedRange {
            after: None,
            live_at: 0,
            limit: 10_000,
        },
    )
    .await
    .unwrap()
    .into_iter()
    .map(|item| item.post_id)
    .collect()
}
