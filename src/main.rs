// Feed Fan-Out Server - Source writes, change triggers and feed reads over HTTP

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use feed_fanout::{
    api::create_app,
    app_state::AppState,
    config::Config,
    infrastructure::RetentionSweeper,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("feed_fanout=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config).await?;

    match app_state.config.sweeper.interval() {
        Some(interval) => {
            let sweeper = Arc::new(RetentionSweeper::new(
                app_state.database.clone(),
                app_state.metrics.clone(),
                interval,
            ));
            sweeper.start();
        }
        None => info!("retention sweeper disabled"),
    }

    let addr = app_state.config.server_address();
    let app = create_app(app_state);

    info!("Feed fan-out server listening on http://{}", addr);
    info!("  POST   /api/v1/posts                      - Create post and fan out");
    info!("  PUT    /api/v1/friendships/{{id}}           - Upsert friendship");
    info!("  DELETE /api/v1/friendships/{{id}}           - Delete friendship");
    info!("  GET    /api/v1/feeds/{{user_id}}            - Read feed page");
    info!("  POST   /api/v1/triggers/post-created      - Deliver post-created event");
    info!("  POST   /api/v1/triggers/friendship-write  - Deliver friendship write event");
    info!("  GET    /api/v1/stats                      - Pipeline statistics");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
