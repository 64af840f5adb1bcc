// Core types and primitives shared by the fan-out pipeline

pub mod time;

pub use time::{current_time_millis, Millis, FEED_ITEM_TTL_MS};

/// User identifier as issued by the auth backend.
pub type UserId = String;

/// Post identifier; also the key of every feed item derived from the post.
pub type PostId = String;

/// Upper bound on posts replayed into a new friend's feed per direction.
pub const BACKFILL_POST_LIMIT: u32 = 50;
