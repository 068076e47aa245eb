//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Every multi-statement transaction in this crate starts with a write. SQLite then takes the write lock up front and
//! waits for it under the busy timeout, instead of failing later when a reader tries to upgrade its lock.
use std::str::FromStr;

use log::*;
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Error as SqlxError,
    SqlitePool,
};

use crate::config::StoreConfig;

pub mod orders;
pub mod payment_logs;
pub mod wallets;

pub async fn new_pool(config: &StoreConfig) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.busy_timeout)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await?;
    debug!("🗃️ Connected to {} with up to {} connections", config.database_url, config.max_connections);
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./src/sqlite/migrations").run(pool).await?;
    info!("🗃️ Database migrations complete");
    Ok(())
}
