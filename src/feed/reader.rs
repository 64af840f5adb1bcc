use std::sync::Arc;
use tracing::instrument;

use crate::core::current_time_millis;
use crate::error::{AppError, AppResult};
use crate::feed::cursor::FeedCursor;
use crate::infrastructure::database::{FeedPosition, FeedRange, FeedStore};
use crate::models::FeedPage;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Paginated reader over a single recipient's feed.
#[derive(Clone)]
pub struct FeedReader {
    feeds: Arc<dyn FeedStore>,
    default_page_size: u32,
}

impl FeedReader {
    pub fn new(feeds: Arc<dyn FeedStore>, default_page_size: u32) -> Self {
        Self {
            feeds,
            default_page_size: default_page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Returns up to `page_size` items newest first, starting after `cursor`.
    /// Items past their expiry are hidden even if not yet swept.
    #[instrument(skip(self, cursor))]
    pub async fn read_page(
        &self,
        recipient_id: &str,
        page_size: Option<u32>,
        cursor: Option<&str>,
    ) -> AppResult<FeedPage> {
        if recipient_id.trim().is_empty() {
            return Err(AppError::BadRequest("recipient id cannot be empty".to_string()));
        }

        let page_size = page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, MAX_PAGE_SIZE);
        let after = cursor
            .map(FeedCursor::decode)
            .transpose()?
            .map(FeedCursor::into_position);

        let mut items = self
            .feeds
            .list_feed_items(
                recipient_id,
                FeedRange {
                    after,
                    live_at: current_time_millis(),
                    limit: page_size + 1,
                },
            )
            .await?;

        let next_cursor = if items.len() > page_size as usize {
            items.truncate(page_size as usize);
            items
                .last()
                .map(|last| FeedCursor::new(FeedPosition::from(last)).encode())
        } else {
            None
        };

        Ok(FeedPage { items, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteDatabase;
    use crate::models::{FeedItem, Post};

    async fn feed_with(count: i64) -> Arc<SqliteDatabase> {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let now = current_time_millis();
        for i in 0..count {
            let post = Post::new(format!("p{:02}", i), "alice", Some(now - 1_000 * (count - i)));
            db.put_feed_item("bob", &FeedItem::from_post(&post)).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn walks_every_page_exactly_once() {
        let reader = FeedReader::new(feed_with(7).await, 20);

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = reader.read_page("bob", Some(3), cursor.as_deref()).await.unwrap();
            assert!(page.items.len() <= 3);
            seen.extend(page.items.iter().map(|i| i.post_id.clone()));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let expected: Vec<String> = (0..7).rev().map(|i| format!("p{:02}", i)).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn exact_fit_has_no_next_cursor() {
        let reader = FeedReader::new(feed_with(3).await, 3);
        let page = reader.read_page("bob", None, None).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let reader = FeedReader::new(feed_with(2).await, 20);
        let page = reader.read_page("bob", Some(0), None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_cursor.is_some());
    }

    #[tokio::test]
    async fn expired_items_are_hidden() {
        let db = feed_with(1).await;
        let ancient = FeedItem::from_post_at(&Post::new("old", "alice", Some(0)), 0);
        db.put_feed_item("bob", &ancient).await.unwrap();

        let page = FeedReader::new(db, 20).read_page("bob", None, None).await.unwrap();
        let ids: Vec<&str> = page.items.iter().map(|i| i.post_id.as_str()).collect();
        assert_eq!(ids, vec!["p00"]);
    }

    #[tokio::test]
    async fn malformed_cursor_is_rejected() {
        let reader = FeedReader::new(feed_with(1).await, 20);
        let result = reader.read_page("bob", None, Some("not a cursor")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
