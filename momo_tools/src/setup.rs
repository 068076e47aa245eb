use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use momo_payment_engine::{sqlite_db::run_migrations, StoreConfig};
use sqlx::{
    migrate::{MigrateDatabase, Migrator},
    Sqlite,
};

use crate::store::open_store;

/// Setup commands work directly on the database named by `MOMO_DATABASE_URL`.
#[derive(Debug, Subcommand)]
pub enum SetupCommand {
    /// Run the database migrations.
    Migrate(MigrateParams),
}

#[derive(Debug, Args)]
pub struct MigrateParams {
    /// The path to the migrations directory. The migrations are embedded in the binary by default, and so this
    /// parameter is optional. If provided, the migrations at <path> will be executed instead.
    #[arg(short, long)]
    pub path: Option<String>,
}

pub async fn handle_setup_command(command: SetupCommand) -> Result<()> {
    match command {
        SetupCommand::Migrate(params) => migrate_db(params).await,
    }
}

async fn migrate_db(params: MigrateParams) -> Result<()> {
    create_database_if_not_exist().await?;
    let db = open_store().await?;
    match &params.path {
        Some(path) => {
            println!("Running migrations at: {path}");
            let migrator = Migrator::new(Path::new(path)).await?;
            migrator.run(db.pool()).await?;
        },
        None => {
            println!("Running embedded migrations");
            run_migrations(db.pool()).await?;
        },
    }
    db.pool().close().await;
    println!("Migrations complete");
    Ok(())
}

async fn create_database_if_not_exist() -> Result<()> {
    let url = StoreConfig::from_env_or_default().database_url;
    if !Sqlite::database_exists(&url).await? {
        println!("Creating new database at: {url}");
        Sqlite::create_database(&url).await?;
    }
    Ok(())
}
