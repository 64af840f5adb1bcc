use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::FanoutConfig;
use crate::core::BACKFILL_POST_LIMIT;
use crate::error::AppError;
use crate::fanout::backfill::{is_acceptance_transition, BackfillEngine};
use crate::fanout::fanout_engine::FanoutEngine;
use crate::fanout::friend_graph::FriendGraph;
use crate::infrastructure::database::{FeedStore, FriendshipStore, PostStore};
use crate::infrastructure::monitoring::PipelineMetrics;
use crate::models::{Friendship, Post};

/// Change-trigger entry points of the pipeline.
///
/// Neither handler returns an error: whatever happens here, the post or
/// friendship write that fired the trigger stays committed. Outcomes are
/// logged and counted in [`PipelineMetrics`].
#[derive(Clone)]
pub struct FeedTriggers {
    fanout: FanoutEngine,
    backfill: BackfillEngine,
    metrics: PipelineMetrics,
}

impl FeedTriggers {
    pub fn new(
        friendships: Arc<dyn FriendshipStore>,
        posts: Arc<dyn PostStore>,
        feeds: Arc<dyn FeedStore>,
        config: &FanoutConfig,
        metrics: PipelineMetrics,
    ) -> Self {
        let friends = FriendGraph::new(friendships, config.friend_query_limit);
        Self {
            fanout: FanoutEngine::new(friends, feeds.clone(), config.max_in_flight_writes),
            backfill: BackfillEngine::new(
                posts,
                feeds,
                config.max_in_flight_writes,
                BACKFILL_POST_LIMIT,
            ),
            metrics,
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Invoked once per newly created post.
    pub async fn on_post_created(&self, post: &Post) {
        match self.fanout.fan_out(post).await {
            Ok(report) => self.metrics.record_fanout(&report.tally).await,
            Err(AppError::Validation(reason)) => {
                warn!(post_id = %post.id, %reason, "post rejected by fan-out");
                self.metrics.record_fanout_rejected().await;
            }
            Err(e) => {
                error!(post_id = %post.id, error = %e, "fan-out aborted");
                self.metrics.record_fanout_failed().await;
            }
        }
    }

    /// Invoked on every create, update or delete of a friendship.
    pub async fn on_friendship_write(&self, before: Option<&Friendship>, after: Option<&Friendship>) {
        let accepted = match after {
            Some(after) if is_acceptance_transition(before, Some(after)) => after,
            _ => {
                debug!(
                    before = ?before.map(|f| f.status),
                    after = ?after.map(|f| f.status),
                    "friendship write is not an acceptance; no backfill"
                );
                self.metrics.record_friendship_write_ignored().await;
                return;
            }
        };

        if let Err(e) = accepted.validate() {
            warn!(friendship_id = %accepted.id, error = %e, "skipping backfill");
            self.metrics.record_friendship_write_ignored().await;
            return;
        }

        self.metrics.record_backfill_triggered().await;
        let report = self.backfill.backfill(accepted).await;

        for direction in [&report.requester_feed, &report.addressee_feed] {
            match direction {
                Ok(direction) => self.metrics.record_backfill_direction(Some(&direction.tally)).await,
                Err(e) => {
                    error!(friendship_id = %report.friendship_id, error = %e, "backfill direction aborted");
                    self.metrics.record_backfill_direction(None).await;
                }
            }
        }
    }

    /// Runs [`FeedTriggers::on_post_created`] on its own task, detached from the caller's write.
    pub fn spawn_post_created(&self, post: Post) -> JoinHandle<()> {
        let triggers = self.clone();
        tokio::spawn(async move { triggers.on_post_created(&post).await })
    }

    /// Runs [`FeedTriggers::on_friendship_write`] on its own task.
    pub fn spawn_friendship_write(
        &self,
        before: Option<Friendship>,
        after: Option<Friendship>,
    ) -> JoinHandle<()> {
        let triggers = self.clone();
        tokio::spawn(async move {
            triggers
                .on_friendship_write(before.as_ref(), after.as_ref())
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::testing::{BrokenFriendshipStore, FailingPostStore};
    use crate::infrastructure::SqliteDatabase;
    use crate::models::FriendshipStatus;

    async fn setup() -> (Arc<SqliteDatabase>, FeedTriggers) {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let triggers = FeedTriggers::new(
            db.clone(),
            db.clone(),
            db.clone(),
            &FanoutConfig::default(),
            PipelineMetrics::new(),
        );
        (db, triggers)
    }

    #[tokio::test]
    async fn invalid_post_is_counted_as_rejected() {
        let (_db, triggers) = setup().await;
        triggers.on_post_created(&Post::new("p1", "", None)).await;

        let stats = triggers.metrics().snapshot().await;
        assert_eq!(stats.fanouts_rejected, 1);
        assert_eq!(stats.fanouts_completed, 0);
    }

    #[tokio::test]
    async fn graph_failure_is_swallowed() {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let triggers = FeedTriggers::new(
            Arc::new(BrokenFriendshipStore),
            db.clone(),
            db.clone(),
            &FanoutConfig::default(),
            PipelineMetrics::new(),
        );

        triggers.on_post_created(&Post::new("p1", "alice", Some(1))).await;

        assert_eq!(triggers.metrics().snapshot().await.fanouts_failed, 1);
        assert_eq!(db.count_feed_items("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn repeated_acceptance_does_not_backfill_again() {
        let (db, triggers) = setup().await;
        db.create_post(&Post::new("a1", "alice", Some(10))).await.unwrap();

        let pending = Friendship::new("f1", "dave", "alice", FriendshipStatus::Pending);
        let accepted = pending.with_status(FriendshipStatus::Accepted);

        triggers.on_friendship_write(None, Some(&pending)).await;
        triggers.on_friendship_write(Some(&pending), Some(&accepted)).await;
        triggers.on_friendship_write(Some(&accepted), Some(&accepted)).await;

        let stats = triggers.metrics().snapshot().await;
        assert_eq!(stats.backfills_triggered, 1);
        assert_eq!(stats.friendship_writes_ignored, 2);
        assert_eq!(stats.feed_writes_succeeded, 1);
        assert_eq!(db.count_feed_items("dave").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_history_fetch_is_counted_per_direction() {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        db.create_post(&Post::new("a1", "alice", Some(10))).await.unwrap();
        db.create_post(&Post::new("d1", "dave", Some(20))).await.unwrap();
        let triggers = FeedTriggers::new(
            db.clone(),
            Arc::new(FailingPostStore {
                inner: db.clone(),
                failing_authors: ["alice".to_string()].into_iter().collect(),
            }),
            db.clone(),
            &FanoutConfig::default(),
            PipelineMetrics::new(),
        );

        let accepted = Friendship::new("f1", "dave", "alice", FriendshipStatus::Accepted);
        triggers.on_friendship_write(None, Some(&accepted)).await;

        let stats = triggers.metrics().snapshot().await;
        assert_eq!(stats.backfills_triggered, 1);
        assert_eq!(stats.backfill_directions_failed, 1);
        assert_eq!(stats.backfill_directions_completed, 1);
        assert_eq!(db.count_feed_items("alice").await.unwrap(), 1);
        assert_eq!(db.count_feed_items("dave").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn spawned_friendship_write_runs_to_completion() {
        let (db, triggers) = setup().await;
        db.create_post(&Post::new("a1", "alice", Some(10))).await.unwrap();

        let accepted = Friendship::new("f1", "dave", "alice", FriendshipStatus::Accepted);
        triggers
            .spawn_friendship_write(None, Some(accepted))
            .await
            .unwrap();

        assert!(db.get_feed_item("dave", "a1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn spawned_fanout_runs_to_completion() {
        let (db, triggers) = setup().await;
        triggers
            .spawn_post_created(Post::new("p1", "alice", Some(5)))
            .await
            .unwrap();
        assert!(db.get_feed_item("alice", "p1").await.unwrap().is_some());
    }
}
