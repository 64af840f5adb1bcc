// Pipeline Monitoring - Counters for fan-out, backfill and retention outcomes
// Feed misses are silent by contract, so these counters are the only place they surface

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::{current_time_millis, Millis};
use crate::fanout::write_batch::WriteTally;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub fanouts_completed: u64,
    /// Fan-outs aborted before any write because the post failed validation.
    pub fanouts_rejected: u64,
    /// Fan-outs aborted before any write because the friend graph could not be read.
    pub fanouts_failed: u64,
    pub backfills_triggered: u64,
    pub backfill_directions_completed: u64,
    pub backfill_directions_failed: u64,
    /// Friendship writes that were not a transition into `accepted`.
    pub friendship_writes_ignored: u64,
    pub feed_writes_succeeded: u64,
    pub feed_writes_failed: u64,
    pub sweeps_run: u64,
    pub feed_items_expired: u64,
    pub last_sweep_at: Option<Millis>,
}

/// Shared, cheaply clonable handle over the pipeline counters
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    stats: Arc<RwLock<PipelineStats>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_fanout(&self, tally: &WriteTally) {
        let mut stats = self.stats.write().await;
        stats.fanouts_completed += 1;
        stats.feed_writes_succeeded += tally.succeeded as u64;
        stats.feed_writes_failed += tally.failed as u64;
    }

    pub async fn record_fanout_rejected(&self) {
        self.stats.write().await.fanouts_rejected += 1;
    }

    pub async fn record_fanout_failed(&self) {
        self.stats.write().await.fanouts_failed += 1;
    }

    pub async fn record_backfill_triggered(&self) {
        self.stats.write().await.backfills_triggered += 1;
    }

    pub async fn record_backfill_direction(&self, tally: Option<&WriteTally>) {
        let mut stats = self.stats.write().await;
        match tally {
            Some(tally) => {
                stats.backfill_directions_completed += 1;
                stats.feed_writes_succeeded += tally.succeeded as u64;
                stats.feed_writes_failed += tally.failed as u64;
            }
            None => stats.backfill_directions_failed += 1,
        }
    }

    pub async fn record_friendship_write_ignored(&self) {
        self.stats.write().await.friendship_writes_ignored += 1;
    }

    pub async fn record_sweep(&self, removed: u64) {
        let mut stats = self.stats.write().await;
        stats.sweeps_run += 1;
        stats.feed_items_expired += removed;
        stats.last_sweep_at = Some(current_time_millis());
    }

    pub async fn snapshot(&self) -> PipelineStats {
        self.stats.read().await.clone()
    }
}
