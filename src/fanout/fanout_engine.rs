use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::PostId;
use crate::error::AppResult;
use crate::fanout::friend_graph::FriendGraph;
use crate::fanout::write_batch::{FeedWriteBatch, WriteTally};
use crate::infrastructure::database::FeedStore;
use crate::models::{FeedItem, Post};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutReport {
    pub post_id: PostId,
    pub recipients: usize,
    pub tally: WriteTally,
}

/// Replicates a newly created post into the feed of its author and of every
/// accepted friend of the author.
#[derive(Clone)]
pub struct FanoutEngine {
    friends: FriendGraph,
    writer: FeedWriteBatch,
}

impl FanoutEngine {
    pub fn new(friends: FriendGraph, feeds: Arc<dyn FeedStore>, max_in_flight: usize) -> Self {
        Self {
            friends,
            writer: FeedWriteBatch::new(feeds, max_in_flight),
        }
    }

    /// Writes one feed item per recipient, keyed by post id.
    ///
    /// Errors only when the post has no author or the friend graph cannot be
    /// read; in both cases nothing has been written. Individual write failures
    /// are reported in the tally.
    ///
    /// The recipient set is the friend graph at call time, so re-running for
    /// the same post after the graph changed reaches the current friends.
    #[instrument(skip(self, post), fields(post_id = %post.id))]
    pub async fn fan_out(&self, post: &Post) -> AppResult<FanoutReport> {
        let author_id = post.author()?;

        let mut recipients = self.friends.accepted_friends(author_id).await?;
        recipients.insert(author_id.to_string());

        let item = FeedItem::from_post(post);
        let recipient_count = recipients.len();
        let writes: Vec<_> = recipients
            .into_iter()
            .map(|recipient| (recipient, item.clone()))
            .collect();
        let tally = self.writer.write_all(writes).await;

        info!(
            author_id,
            recipients = recipient_count,
            succeeded = tally.succeeded,
            failed = tally.failed,
            "fan-out settled"
        );

        Ok(FanoutReport {
            post_id: post.id.clone(),
            recipients: recipient_count,
            tally,
        })
    }
}
