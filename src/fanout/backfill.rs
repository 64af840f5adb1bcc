use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::{current_time_millis, UserId};
use crate::error::AppResult;
use crate::fanout::write_batch::{FeedWriteBatch, WriteTally};
use crate::infrastructure::database::{FeedStore, PostStore};
use crate::models::{FeedItem, Friendship};

/// True only for a write that moves a friendship into `accepted` from any
/// other state (including "did not exist").
pub fn is_acceptance_transition(before: Option<&Friendship>, after: Option<&Friendship>) -> bool {
    let was_accepted = before.is_some_and(Friendship::is_accepted);
    let is_accepted = after.is_some_and(Friendship::is_accepted);
    !was_accepted && is_accepted
}

/// Outcome of replaying one friend's history into one viewer's feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionReport {
    pub viewer_id: UserId,
    pub friend_id: UserId,
    pub posts_found: usize,
    pub tally: WriteTally,
}

/// Both directions of a backfill, reported independently.
#[derive(Debug)]
pub struct BackfillReport {
    pub friendship_id: String,
    /// The requester's feed receiving the addressee's posts.
    pub requester_feed: AppResult<DirectionReport>,
    /// The addressee's feed receiving the requester's posts.
    pub addressee_feed: AppResult<DirectionReport>,
}

/// Populates the feeds of two new friends with each other's recent posts.
#[derive(Clone)]
pub struct BackfillEngine {
    posts: Arc<dyn PostStore>,
    writer: FeedWriteBatch,
    post_limit: u32,
}

impl BackfillEngine {
    pub fn new(
        posts: Arc<dyn PostStore>,
        feeds: Arc<dyn FeedStore>,
        max_in_flight: usize,
        post_limit: u32,
    ) -> Self {
        Self {
            posts,
            writer: FeedWriteBatch::new(feeds, max_in_flight),
            post_limit,
        }
    }

    /// Runs both directions concurrently; a failure in one never stops the other.
    #[instrument(skip(self, friendship), fields(friendship_id = %friendship.id))]
    pub async fn backfill(&self, friendship: &Friendship) -> BackfillReport {
        let (requester_feed, addressee_feed) = tokio::join!(
            self.backfill_direction(&friendship.requester_id, &friendship.addressee_id),
            self.backfill_direction(&friendship.addressee_id, &friendship.requester_id),
        );

        BackfillReport {
            friendship_id: friendship.id.clone(),
            requester_feed,
            addressee_feed,
        }
    }

    /// Writes up to `post_limit` of `friend_id`'s most recent posts into
    /// `viewer_id`'s feed. A friend without posts is a no-op.
    #[instrument(skip(self))]
    pub async fn backfill_direction(&self, viewer_id: &str, friend_id: &str) -> AppResult<DirectionReport> {
        let posts = self
            .posts
            .recent_posts_by_author(friend_id, self.post_limit)
            .await?;

        if posts.is_empty() {
            debug!(viewer_id, friend_id, "friend has no posts to backfill");
            return Ok(DirectionReport {
                viewer_id: viewer_id.to_string(),
                friend_id: friend_id.to_string(),
                posts_found: 0,
                tally: WriteTally::default(),
            });
        }

        let now = current_time_millis();
        let writes: Vec<(UserId, FeedItem)> = posts
            .iter()
            .map(|post| (viewer_id.to_string(), FeedItem::from_post_at(post, now)))
            .collect();
        let tally = self.writer.write_all(writes).await;

        info!(
            viewer_id,
            friend_id,
            posts = posts.len(),
            succeeded = tally.succeeded,
            failed = tally.failed,
            "backfill direction settled"
        );

        Ok(DirectionReport {
            viewer_id: viewer_id.to_string(),
            friend_id: friend_id.to_string(),
            posts_found: posts.len(),
            tally,
        })
    }
}
