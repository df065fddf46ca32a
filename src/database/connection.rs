use log::info;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{config::Config, error::QueryError};

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, QueryError> {
    info!(
        "Connecting to database (max {} connections)",
        config.max_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), QueryError> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;

    Ok(())
}
