use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    app_state::AppState,
    core::{current_time_millis, Millis, UserId},
    error::{AppError, AppResult},
    infrastructure::{FriendshipStore, PipelineStats, PostStore},
    models::{FeedPage, Friendship, FriendshipStatus, MediaDescriptor, Post},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub author_id: UserId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaDescriptor>,
    #[serde(default)]
    pub aspect_ratio: Option<f64>,
    #[serde(default)]
    pub created_at: Option<Millis>,
}

impl CreatePostRequest {
    fn into_post(self, now: Millis) -> Post {
        let created_at = self.created_at.unwrap_or(now);
        Post {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            author_id: self.author_id.trim().to_string(),
            text: self.text,
            media: self.media,
            aspect_ratio: self.aspect_ratio,
            created_at: Some(created_at),
            updated_at: Some(created_at),
            deleted: false,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutFriendshipRequest {
    pub requester_id: UserId,
    pub addressee_id: UserId,
    pub status: FriendshipStatus,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// Before/after images of a friendship document as delivered by a change feed.
#[derive(Debug, Deserialize)]
pub struct FriendshipWriteEvent {
    #[serde(default)]
    pub before: Option<Friendship>,
    #[serde(default)]
    pub after: Option<Friendship>,
}

// HTTP Handlers

pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.database.health_check().await?;
    Ok(Json(json!({"status": "ok"})))
}

pub async fn create_post_handler(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let post = req.into_post(current_time_millis());
    post.validate()?;

    state.database.create_post(&post).await?;
    info!(post_id = %post.id, author_id = %post.author_id, "post committed");

    state.triggers.spawn_post_created(post.clone());
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn put_friendship_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<PutFriendshipRequest>,
) -> AppResult<Json<Friendship>> {
    let now = current_time_millis();
    let mut after = Friendship::new(id, req.requester_id, req.addressee_id, req.status);
    after.validate()?;
    after.updated_at = Some(now);

    let before = state.database.upsert_friendship(&after).await?;
    after.created_at = before.as_ref().and_then(|previous| previous.created_at).or(Some(now));
    info!(friendship_id = %after.id, status = %after.status, "friendship committed");

    state
        .triggers
        .spawn_friendship_write(before, Some(after.clone()));
    Ok(Json(after))
}

pub async fn delete_friendship_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> AppResult<Json<Friendship>> {
    let before = state
        .database
        .delete_friendship(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Friendship {} not found", id)))?;

    state
        .triggers
        .spawn_friendship_write(Some(before.clone()), None);
    Ok(Json(before))
}

pub async fn get_feed_handler(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<String>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<FeedPage>> {
    let page = state
        .reader
        .read_page(&user_id, params.limit, params.cursor.as_deref())
        .await?;
    Ok(Json(page))
}

pub async fn post_created_trigger_handler(
    State(state): State<AppState>,
    Json(post): Json<Post>,
) -> StatusCode {
    state.triggers.on_post_created(&post).await;
    StatusCode::ACCEPTED
}

pub async fn friendship_write_trigger_handler(
    State(state): State<AppState>,
    Json(event): Json<FriendshipWriteEvent>,
) -> StatusCode {
    state
        .triggers
        .on_friendship_write(event.before.as_ref(), event.after.as_ref())
        .await;
    StatusCode::ACCEPTED
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<PipelineStats> {
    Json(state.metrics.snapshot().await)
}
