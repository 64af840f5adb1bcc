use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row};
use std::path::Path;
use std::str::FromStr;

use crate::core::{current_time_millis, Millis, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{FeedRange, FeedStore, FriendshipStore, PostStore};
use crate::models::{FeedItem, Friendship, FriendshipRole, FriendshipStatus, MediaDescriptor, Post};

const POST_COLUMNS: &str =
    "id, author_id, text, media, aspect_ratio, created_at, updated_at, deleted, deleted_at";
const FRIENDSHIP_COLUMNS: &str = "id, requester_id, addressee_id, status, created_at, updated_at";

/// SQLite creates a missing database file but not its directory.
fn ensure_parent_dir(database_url: &str) -> AppResult<()> {
    let Some(path) = database_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    let path = path.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Cannot create {}: {}", parent.display(), e))
            }),
        _ => Ok(()),
    }
}

/// SQLite implementation of the post, friendship and feed stores
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        ensure_parent_dir(database_url)?;
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid database URL {}: {}", database_url, e))
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", database_url, e)))?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Single-connection in-memory database; every pooled connection to
    /// `:memory:` would otherwise see its own empty database.
    pub async fn new_in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                author_id TEXT NOT NULL,
                text TEXT,
                media TEXT NOT NULL DEFAULT '[]',
                aspect_ratio REAL,
                created_at INTEGER,
                updated_at INTEGER,
                deleted INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create posts table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS friendships (
                id TEXT PRIMARY KEY,
                requester_id TEXT NOT NULL,
                addressee_id TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER,
                updated_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create friendships table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_items (
                recipient_id TEXT NOT NULL,
                post_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expire_at INTEGER NOT NULL,
                PRIMARY KEY (recipient_id, post_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create feed_items table: {}", e)))?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_posts_author_created ON posts(author_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_friendships_requester ON friendships(requester_id, status)",
            "CREATE INDEX IF NOT EXISTS idx_friendships_addressee ON friendships(addressee_id, status)",
            "CREATE INDEX IF NOT EXISTS idx_feed_items_recipient_created ON feed_items(recipient_id, created_at DESC, post_id DESC)",
            "CREATE INDEX IF NOT EXISTS idx_feed_items_expire ON feed_items(expire_at)",
        ];
        for statement in indexes {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to create index: {}", e)))?;
        }

        Ok(())
    }

    /// Health check to verify database connectivity
    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}

fn post_from_row(row: &SqliteRow) -> AppResult<Post> {
    let id: String = row.get("id");
    let media_json: String = row.get("media");
    let media: Vec<MediaDescriptor> = serde_json::from_str(&media_json).map_err(|e| {
        AppError::DeserializationError(format!("Corrupt media column on post {}: {}", id, e))
    })?;

    Ok(Post {
        id,
        author_id: row.get("author_id"),
        text: row.get("text"),
        media,
        aspect_ratio: row.get("aspect_ratio"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted: row.get::<i64, _>("deleted") != 0,
        deleted_at: row.get("deleted_at"),
    })
}

fn friendship_from_row(row: &SqliteRow) -> AppResult<Friendship> {
    let status: String = row.get("status");
    Ok(Friendship {
        id: row.get("id"),
        requester_id: row.get("requester_id"),
        addressee_id: row.get("addressee_id"),
        status: FriendshipStatus::from_str(&status)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn feed_item_from_row(row: &SqliteRow) -> FeedItem {
    FeedItem {
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        expire_at: row.get("expire_at"),
    }
}

#[async_trait]
impl FriendshipStore for SqliteDatabase {
    async fn accepted_friend_ids(
        &self,
        user_id: &str,
        role: FriendshipRole,
        limit: u32,
    ) -> AppResult<Vec<UserId>> {
        let sql = match role {
            FriendshipRole::Requester => {
                "SELECT addressee_id AS friend_id FROM friendships WHERE requester_id = ? AND status = ? LIMIT ?"
            }
            FriendshipRole::Addressee => {
                "SELECT requester_id AS friend_id FROM friendships WHERE addressee_id = ? AND status = ? LIMIT ?"
            }
        };

        let rows = sqlx::query(sql)
            .bind(user_id)
            .bind(FriendshipStatus::Accepted.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "Failed to query {:?} friendships of {}: {}",
                    role, user_id, e
                ))
            })?;

        Ok(rows.iter().map(|row| row.get("friend_id")).collect())
    }

    async fn get_friendship(&self, id: &str) -> AppResult<Option<Friendship>> {
        let row = sqlx::query(&format!("SELECT {} FROM friendships WHERE id = ?", FRIENDSHIP_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get friendship {}: {}", id, e)))?;

        row.as_ref().map(friendship_from_row).transpose()
    }

    async fn upsert_friendship(&self, friendship: &Friendship) -> AppResult<Option<Friendship>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let previous = sqlx::query(&format!("SELECT {} FROM friendships WHERE id = ?", FRIENDSHIP_COLUMNS))
            .bind(&friendship.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to read friendship {}: {}", friendship.id, e))
            })?
            .as_ref()
            .map(friendship_from_row)
            .transpose()?;

        let now = current_time_millis();
        let created_at = friendship
            .created_at
            .or_else(|| previous.as_ref().and_then(|p| p.created_at))
            .unwrap_or(now);
        let updated_at = friendship.updated_at.unwrap_or(now);

        sqlx::query(
            r#"
            INSERT INTO friendships (id, requester_id, addressee_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                requester_id = excluded.requester_id,
                addressee_id = excluded.addressee_id,
                status = excluded.status,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&friendship.id)
        .bind(&friendship.requester_id)
        .bind(&friendship.addressee_id)
        .bind(friendship.status.as_str())
        .bind(created_at)
        .bind(updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to upsert friendship {}: {}", friendship.id, e))
        })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit transaction: {}", e)))?;

        Ok(previous)
    }

    async fn delete_friendship(&self, id: &str) -> AppResult<Option<Friendship>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let previous = sqlx::query(&format!("SELECT {} FROM friendships WHERE id = ?", FRIENDSHIP_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read friendship {}: {}", id, e)))?
            .as_ref()
            .map(friendship_from_row)
            .transpose()?;

        sqlx::query("DELETE FROM friendships WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete friendship {}: {}", id, e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit transaction: {}", e)))?;

        Ok(previous)
    }
}

#[async_trait]
impl PostStore for SqliteDatabase {
    async fn create_post(&self, post: &Post) -> AppResult<()> {
        let media = serde_json::to_string(&post.media)?;
        sqlx::query(&format!(
            "INSERT INTO posts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            POST_COLUMNS
        ))
        .bind(&post.id)
        .bind(&post.author_id)
        .bind(&post.text)
        .bind(media)
        .bind(post.aspect_ratio)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.deleted as i64)
        .bind(post.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                AppError::BadRequest(format!("Post {} already exists", post.id))
            }
            _ => AppError::DatabaseError(format!("Failed to create post {}: {}", post.id, e)),
        })?;
        Ok(())
    }

    async fn get_post(&self, id: &str) -> AppResult<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get post {}: {}", id, e)))?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn recent_posts_by_author(&self, author_id: &str, limit: u32) -> AppResult<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts WHERE author_id = ? AND deleted = 0 \
             ORDER BY created_at IS NULL, created_at DESC, id DESC LIMIT ?",
            POST_COLUMNS
        ))
        .bind(author_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to get recent posts of {}: {}", author_id, e))
        })?;

        rows.iter().map(post_from_row).collect()
    }
}

#[async_trait]
impl FeedStore for SqliteDatabase {
    async fn put_feed_item(&self, recipient_id: &str, item: &FeedItem) -> AppResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO feed_items (recipient_id, post_id, author_id, created_at, expire_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(recipient_id)
        .bind(&item.post_id)
        .bind(&item.author_id)
        .bind(item.created_at)
        .bind(item.expire_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!(
                "Failed to write feed item {} for {}: {}",
                item.post_id, recipient_id, e
            ))
        })?;
        Ok(())
    }

    async fn get_feed_item(&self, recipient_id: &str, post_id: &str) -> AppResult<Option<FeedItem>> {
        let row = sqlx::query(
            "SELECT post_id, author_id, created_at, expire_at FROM feed_items \
             WHERE recipient_id = ? AND post_id = ?",
        )
        .bind(recipient_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!(
                "Failed to get feed item {} for {}: {}",
                post_id, recipient_id, e
            ))
        })?;

        Ok(row.as_ref().map(feed_item_from_row))
    }

    async fn list_feed_items(&self, recipient_id: &str, range: FeedRange) -> AppResult<Vec<FeedItem>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT post_id, author_id, created_at, expire_at FROM feed_items WHERE recipient_id = ",
        );
        qb.push_bind(recipient_id);
        qb.push(" AND expire_at >= ");
        qb.push_bind(range.live_at);

        if let Some(after) = range.after {
            qb.push(" AND (created_at < ");
            qb.push_bind(after.created_at);
            qb.push(" OR (created_at = ");
            qb.push_bind(after.created_at);
            qb.push(" AND post_id < ");
            qb.push_bind(after.post_id);
            qb.push("))");
        }

        qb.push(" ORDER BY created_at DESC, post_id DESC LIMIT ");
        qb.push_bind(range.limit as i64);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to list feed of {}: {}", recipient_id, e))
        })?;

        Ok(rows.iter().map(feed_item_from_row).collect())
    }

    async fn count_feed_items(&self, recipient_id: &str) -> AppResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM feed_items WHERE recipient_id = ?")
            .bind(recipient_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to count feed of {}: {}", recipient_id, e))
            })?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn delete_expired_feed_items(&self, now: Millis) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM feed_items WHERE expire_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete expired feed items: {}", e)))?;
        Ok(result.rows_affected())
    }
}
