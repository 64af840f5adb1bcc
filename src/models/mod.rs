// Domain records: canonical posts, friendship edges and replicated feed items

pub mod feed_item;
pub mod friendship;
pub mod post;

pub use feed_item::{FeedItem, FeedPage};
pub use friendship::{Friendship, FriendshipRole, FriendshipStatus};
pub use post::{CropParams, MediaDescriptor, Post};
