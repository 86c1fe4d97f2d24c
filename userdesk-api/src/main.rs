//! # UserDesk API Server
//!
//! Serves the user resource over HTTP, backed by PostgreSQL or, with
//! `DATABASE_URL=memory`, by an in-process store.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/userdesk cargo run -p userdesk-api
//! ```

use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use userdesk_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use userdesk_shared::{
    db::{migrations, pool},
    repository::{InMemoryUserRepository, PgUserRepository, UserRepository},
};

const DEFAULT_LOG_FILTER: &str = "userdesk_api=debug,userdesk_shared=info,tower_http=debug";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    if config.database.run_migrations {
        migrations::ensure_database_exists(&config.database.url)
            .await
            .context("Failed to create database")?;
    }

    let pool = pool::create_pool(config.database.pool_config())
        .await
        .context("Failed to connect to database")?;

    if config.database.run_migrations {
        migrations::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;

        let status = migrations::get_migration_status(&pool).await?;
        tracing::info!(
            applied = status.applied_migrations,
            latest = ?status.latest_version,
            "Database schema ready"
        );
    }

    Ok(pool)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log.format);

    tracing::info!(
        "UserDesk API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let (users, pool): (Arc<dyn UserRepository>, Option<PgPool>) = if config.database.is_memory() {
        tracing::warn!("Using in-memory repository; data is lost on exit");
        (Arc::new(InMemoryUserRepository::new()), None)
    } else {
        let pool = connect(&config).await?;
        (Arc::new(PgUserRepository::new(pool.clone())), Some(pool))
    };

    let address = config.bind_address();
    let app = build_router(AppState::new(users, config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool::close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}
