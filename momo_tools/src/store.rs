use anyhow::{Context, Result};
use momo_payment_engine::{SqliteDatabase, StoreConfig};

pub async fn open_store() -> Result<SqliteDatabase> {
    let config = StoreConfig::from_env_or_default();
    SqliteDatabase::new(&config).await.with_context(|| format!("Could not open the database at {}", config.database_url))
}
