use crate::config::Config;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(cfg: &Config) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        max_connections = cfg.db_max_connections,
        "connecting to postgres"
    );
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .connect(&cfg.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
