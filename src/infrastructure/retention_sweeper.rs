// Retention Sweeper - Periodic removal of feed items past their expiry
// Feed items carry an absolute `expire_at`; nothing else deletes them.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::core::{current_time_millis, Millis};
use crate::error::AppResult;
use crate::infrastructure::database::FeedStore;
use crate::infrastructure::monitoring::PipelineMetrics;

pub struct RetentionSweeper {
    feeds: Arc<dyn FeedStore>,
    metrics: PipelineMetrics,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(feeds: Arc<dyn FeedStore>, metrics: PipelineMetrics, interval: Duration) -> Self {
        Self {
            feeds,
            metrics,
            interval,
        }
    }

    /// Deletes every feed item with `expire_at < now` and returns how many went.
    #[instrument(skip(self))]
    pub async fn sweep_once(&self, now: Millis) -> AppResult<u64> {
        let removed = self.feeds.delete_expired_feed_items(now).await?;
        self.metrics.record_sweep(removed).await;
        if removed > 0 {
            info!(removed, "expired feed items removed");
        }
        Ok(removed)
    }

    /// Spawns the sweep loop. The first sweep runs immediately.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(interval_secs = self.interval.as_secs(), "starting retention sweeper");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if let Err(e) = self.sweep_once(current_time_millis()).await {
                    error!(error = %e, "retention sweep failed");
                }
            }
        })
    }
}
