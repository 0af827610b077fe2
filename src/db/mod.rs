// src/db/mod.rs

use sqlx::{Pool, Postgres};
use std::env;

pub async fn connect() -> anyhow::Result<Pool<Postgres>> {
    let database_url =
        env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("connected to PostgreSQL, migrations applied");
    Ok(pool)
}
