use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::store::Namespace;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_tables(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create one key-value table per namespace. Idempotent.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    for ns in Namespace::ALL {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            ns.table()
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    Ok(())
}
