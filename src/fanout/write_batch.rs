use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::core::UserId;
use crate::infrastructure::database::FeedStore;
use crate::models::FeedItem;

/// Per-invocation outcome of a batch of independent feed writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl WriteTally {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Bounded group of concurrent feed writes.
///
/// Every write settles on its own; a failed write is logged and counted but
/// never retried, and never aborts its siblings.
#[derive(Clone)]
pub struct FeedWriteBatch {
    feeds: Arc<dyn FeedStore>,
    max_in_flight: usize,
}

impl FeedWriteBatch {
    pub fn new(feeds: Arc<dyn FeedStore>, max_in_flight: usize) -> Self {
        Self {
            feeds,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Issues every `(recipient, item)` write and waits for all of them to settle.
    pub async fn write_all(&self, writes: Vec<(UserId, FeedItem)>) -> WriteTally {
        let feeds = &self.feeds;
        let outcomes: Vec<_> = stream::iter(writes)
            .map(|(recipient_id, item)| async move {
                let result = feeds.put_feed_item(&recipient_id, &item).await;
                (recipient_id, item.post_id, result)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut tally = WriteTally::default();
        for (recipient_id, post_id, result) in outcomes {
            match result {
                Ok(()) => tally.succeeded += 1,
                Err(e) => {
                    tally.failed += 1;
                    warn!(recipient_id = %recipient_id, post_id = %post_id, error = %e, "feed write failed");
                }
            }
        }
        tally
    }
}
