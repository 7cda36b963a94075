//! Database migrations

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Applies versioned migrations and records them in `_migrations`
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))
    }

    /// Applies a migration unless it is already recorded; returns whether it ran
    pub async fn apply(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to open transaction: {}", e)))?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit migration: {}", e)))?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
        Ok(true)
    }

    /// Reverts a migration if it is recorded; returns whether it ran
    ///
    /// The down script and the record removal commit together.
    pub async fn revert(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        if !self.is_applied(migration.version).await? {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to open transaction: {}", e)))?;

        sqlx::raw_sql(migration.down)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to revert migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to remove migration record {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit revert: {}", e)))?;

        info!(version = migration.version, "Reverted migration");
        Ok(true)
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// A versioned schema change
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    /// SQL run when applying
    pub up: &'static str,
    /// SQL run when reverting
    pub down: &'static str,
}

/// Schema for the user store, in ascending version order
pub fn user_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Create users table",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                email VARCHAR(254) NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT users_email_key UNIQUE (email)
            );
            CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at);
            "#,
        down: r#"
            DROP TABLE IF EXISTS users;
            "#,
    }]
}

/// Runs all pending migrations; returns how many were applied
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());
    let mut applied = 0;

    for migration in user_migrations() {
        if migrator.apply(&migration).await? {
            applied += 1;
        }
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_order() {
        let migrations = user_migrations();

        assert!(!migrations.is_empty());

        for pair in migrations.windows(2) {
            assert!(
                pair[1].version > pair[0].version,
                "Migrations should be in ascending order"
            );
        }
    }

    #[test]
    fn test_migrations_content() {
        for migration in user_migrations() {
            assert!(!migration.description.is_empty());
            assert!(!migration.up.trim().is_empty());
            assert!(!migration.down.trim().is_empty());
        }
    }

    // Run with: DATABASE_URL=postgres://... cargo test -- --ignored
    async fn test_migrator() -> PostgresMigrator {
        let url = std::env::var("DATABASE_URL").unwrap();
        PostgresMigrator::new(PgPool::connect(&url).await.unwrap())
    }

    async fn table_exists(migrator: &PostgresMigrator, table: &str) -> bool {
        sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(table)
            .fetch_one(&migrator.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_failed_revert_keeps_schema_and_record() {
        let migrator = test_migrator().await;
        let migration = Migration {
            version: 9_000_001,
            description: "Revert atomicity fixture",
            up: "CREATE TABLE revert_fixture (id INT);",
            down: "DROP TABLE revert_fixture; SELECT 1 / 0;",
        };

        assert!(migrator.apply(&migration).await.unwrap());
        assert!(migrator.revert(&migration).await.is_err());

        assert!(table_exists(&migrator, "revert_fixture").await);
        assert!(migrator.is_applied(migration.version).await.unwrap());

        // Cleanup
        let cleanup = Migration {
            down: "DROP TABLE revert_fixture;",
            ..migration
        };
        assert!(migrator.revert(&cleanup).await.unwrap());
        assert!(!table_exists(&migrator, "revert_fixture").await);
        assert!(!migrator.is_applied(migration.version).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_failed_apply_records_nothing() {
        let migrator = test_migrator().await;
        let migration = Migration {
            version: 9_000_002,
            description: "Apply atomicity fixture",
            up: "CREATE TABLE apply_fixture (id INT); SELECT 1 / 0;",
            down: "DROP TABLE IF EXISTS apply_fixture;",
        };

        assert!(migrator.apply(&migration).await.is_err());

        assert!(!table_exists(&migrator, "apply_fixture").await);
        assert!(!migrator.is_applied(migration.version).await.unwrap());
    }

    #[test]
    fn test_users_table_enforces_unique_email() {
        let create_users = &user_migrations()[0];

        assert!(create_users.up.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(create_users.up.contains("UNIQUE (email)"));
    }
}
