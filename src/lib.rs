//! Project Portal
//!
//! User registration and sign-in for the project portal:
//! - Registration form with per-field validation
//! - Unique, case-insensitive email addresses
//! - Argon2 password hashing and credential checks
//! - In-memory or PostgreSQL user storage

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use api::state::AppState;
use config::StorageBackend;
use infrastructure::storage::{run_migrations, PostgresConfig};
use infrastructure::user::{
    Argon2Hasher, InMemoryUserRepository, PostgresUserRepository, UserService,
};

/// Create application state with the default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create application state for the configured storage backend
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let hasher = Arc::new(Argon2Hasher::new());

    match config.storage.backend {
        StorageBackend::InMemory => {
            info!("Using in-memory user storage");
            let repository = Arc::new(InMemoryUserRepository::new());
            Ok(AppState::new(Arc::new(UserService::new(repository, hasher))))
        }
        StorageBackend::Postgres => {
            let pool = connect_postgres(config).await?;
            let applied = run_migrations(&pool).await?;
            info!(applied, "Using PostgreSQL user storage");

            let repository = Arc::new(PostgresUserRepository::new(pool));
            Ok(AppState::new(Arc::new(UserService::new(repository, hasher))))
        }
    }
}

/// Open a connection pool from `storage.database_url` or `DATABASE_URL`
pub async fn connect_postgres(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let url = config
        .storage
        .resolve_database_url()
        .context("storage.database_url or DATABASE_URL must be set for the postgres backend")?;

    let pool = PostgresConfig::new(url)
        .with_max_connections(config.storage.max_connections)
        .connect()
        .await?;

    Ok(pool)
}
