// Feed Fan-Out HTTP Interface - Source writes, trigger endpoints and feed reads

pub mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::app_state::AppState;
use handlers::*;

/// Routes relative to the API prefix.
pub fn create_feed_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))

        // Source writes; triggers are dispatched after commit
        .route("/posts", post(create_post_handler))
        .route(
            "/friendships/{id}",
            put(put_friendship_handler).delete(delete_friendship_handler),
        )

        // Read path
        .route("/feeds/{user_id}", get(get_feed_handler))

        // External change-feed delivery
        .route("/triggers/post-created", post(post_created_trigger_handler))
        .route("/triggers/friendship-write", post(friendship_write_trigger_handler))

        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Full application: API under `/api/v1` with tracing and CORS layers.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", create_feed_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
