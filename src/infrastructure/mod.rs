// Infrastructure - Storage backends, pipeline counters and background workers
pub mod database;          // Store traits shared by every backend
pub mod sqlite_database;   // SQLite implementation of the stores
pub mod monitoring;        // Pipeline counters
pub mod retention_sweeper; // Expired feed item cleanup

pub use database::{FeedPosition, FeedRange, FeedStore, FriendshipStore, PostStore};
pub use monitoring::{PipelineMetrics, PipelineStats};
pub use retention_sweeper::RetentionSweeper;
pub use sqlite_database::SqliteDatabase;
