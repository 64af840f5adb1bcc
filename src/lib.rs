// Feed Fan-Out - Write-time replication of posts into per-recipient feeds

// Core types and primitives
pub mod core;

// Domain records: posts, friendships, feed items
pub mod models;

// Storage backends and background workers
pub mod infrastructure;

// Fan-out, backfill and change triggers
pub mod fanout;

// Paginated feed reads
pub mod feed;

// HTTP surface
pub mod api;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
