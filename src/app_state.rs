use std::sync::Arc;

use crate::{
    config::Config,
    fanout::FeedTriggers,
    feed::FeedReader,
    infrastructure::{PipelineMetrics, SqliteDatabase},
};

#[derive(Clone)]
pub struct AppState {
    pub database: Arc<SqliteDatabase>,
    pub triggers: FeedTriggers,
    pub reader: FeedReader,
    pub metrics: PipelineMetrics,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let database =
            SqliteDatabase::connect(&config.database.url, config.database.max_connections).await?;
        Ok(Self::with_database(Arc::new(database), config))
    }

    /// Wires the pipeline over an already opened database.
    pub fn with_database(database: Arc<SqliteDatabase>, config: Config) -> Self {
        let metrics = PipelineMetrics::new();
        let triggers = FeedTriggers::new(
            database.clone(),
            database.clone(),
            database.clone(),
            &config.fanout,
            metrics.clone(),
        );
        let reader = FeedReader::new(database.clone(), config.fanout.default_page_size);

        Self {
            database,
            triggers,
            reader,
            metrics,
            config,
        }
    }
}
