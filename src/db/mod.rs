use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct Database {
    pub pg: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let pg = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");

        Ok(Self { pg })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pg).await?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pg.close().await;
        tracing::info!("PostgreSQL connection pool closed");
    }
}
