//! Migrate command - applies or reverts the PostgreSQL schema

use clap::Args;
use tracing::info;

use crate::infrastructure::storage::{run_migrations, user_migrations, PostgresMigrator};

#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Revert applied migrations instead of applying pending ones
    #[arg(long)]
    pub revert: bool,
}

/// Run migrations against `storage.database_url` or `DATABASE_URL`
pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let pool = crate::connect_postgres(&config).await?;

    if args.revert {
        let migrator = PostgresMigrator::new(pool.clone());
        let mut reverted = 0;

        for migration in user_migrations().iter().rev() {
            if migrator.revert(migration).await? {
                reverted += 1;
            }
        }

        info!(reverted, "Migrations reverted");
    } else {
        let applied = run_migrations(&pool).await?;
        let version = PostgresMigrator::new(pool.clone()).current_version().await?;

        info!(applied, version = ?version, "Migrations applied");
    }

    pool.close().await;
    Ok(())
}
