// Sample data seeder - Builds the alice/bob/carol/dave feed scenario

use feed_fanout::{
    app_state::AppState,
    config::Config,
    core::current_time_millis,
    error::AppResult,
    infrastructure::{FeedStore, FriendshipStore, PostStore},
    models::{Friendship, FriendshipStatus, Post},
};

const ALICE_PRIOR_POSTS: i64 = 59;
const DAVE_POSTS: i64 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    println!("🌱 Seeding feed scenario into {}", config.database.url);
    let state = AppState::new(config).await?;

    // alice is friends with bob and carol
    for (id, friend) in [("alice-bob", "bob"), ("alice-carol", "carol")] {
        accept_friendship(&state, id, "alice", friend).await?;
    }

    // History that predates dave: 59 older posts, then p1
    let now = current_time_millis();
    for i in 0..ALICE_PRIOR_POSTS {
        let created_at = now - (ALICE_PRIOR_POSTS - i + 1) * 60_000;
        create_post(&state, &format!("alice-{:02}", i), "alice", created_at).await?;
    }
    create_post(&state, "p1", "alice", now - 60_000).await?;
    for i in 0..DAVE_POSTS {
        create_post(&state, &format!("dave-{:02}", i), "dave", now - (DAVE_POSTS - i) * 30_000).await?;
    }

    for user in ["alice", "bob", "carol", "dave"] {
        let has_p1 = state.database.get_feed_item(user, "p1").await?.is_some();
        println!("  {:<6} feed items: {:>3}  p1 present: {}", user, state.database.count_feed_items(user).await?, has_p1);
    }

    // dave and alice become friends
    let request = Friendship::new("dave-alice", "dave", "alice", FriendshipStatus::Pending);
    let before = state.database.upsert_friendship(&request).await?;
    state
        .triggers
        .on_friendship_write(before.as_ref(), Some(&request))
        .await;
    accept_friendship(&state, "dave-alice", "dave", "alice").await?;

    println!("✅ After dave/alice acceptance:");
    for user in ["alice", "dave"] {
        println!("  {:<6} feed items: {:>3}", user, state.database.count_feed_items(user).await?);
    }

    let stats = state.metrics.snapshot().await;
    println!("📊 {}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn accept_friendship(state: &AppState, id: &str, requester: &str, addressee: &str) -> AppResult<()> {
    let after = Friendship::new(id, requester, addressee, FriendshipStatus::Accepted);
    let before = state.database.upsert_friendship(&after).await?;
    state
        .triggers
        .on_friendship_write(before.as_ref(), Some(&after))
        .await;
    Ok(())
}

async fn create_post(state: &AppState, id: &str, author: &str, created_at: i64) -> AppResult<()> {
    let database = &state.database;
    if database.get_post(id).await?.is_some() {
        return Ok(());
    }
    let post = Post::new(id, author, Some(created_at)).with_text(format!("{} says hi", author));
    database.create_post(&post).await?;
    state.triggers.on_post_created(&post).await;
    Ok(())
}
