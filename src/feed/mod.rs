// Feed Read Path - Cursor-paginated, newest-first reads of one recipient's feed

pub mod cursor;
pub mod reader;

pub use cursor::FeedCursor;
pub use reader::{FeedReader, MAX_PAGE_SIZE};
