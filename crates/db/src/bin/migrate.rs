//! `soundshelf-migrate`: connect, verify, and apply pending migrations.
//!
//! Reads `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS` (default 2
//! here; migrations need a single connection). `LOG_FORMAT=json` switches
//! the log output to JSON lines.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "soundshelf=debug,soundshelf_db=debug,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
        Ok(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {raw}"))?,
        Err(_) => 2,
    };

    let pool = soundshelf_db::create_pool(&database_url, max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!(max_connections, "Database connection pool created");

    soundshelf_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    soundshelf_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    pool.close().await;
    Ok(())
}
