//! Recreate the database schema and empty the photo upload directory.

use fixmate::config::DatabaseSettings;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = DatabaseSettings::from_env()?;
    info!("Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&cfg.database_url)
        .await?;

    fixmate::schema::reset(&pool, &cfg.upload_dir).await?;
    info!("Database schema and upload directory are ready");
    Ok(())
}
