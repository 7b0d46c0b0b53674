//! SQLite-backed [`Store`] implementation.
//!
//! Each [`Namespace`] is its own table (see [`crate::migrate`]) with a
//! `key TEXT PRIMARY KEY` column, so a `put` is a single-row upsert and is
//! atomic per key.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{Namespace, Store};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn put(&self, ns: Namespace, key: &str, value: &[u8]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        // Table names come from a closed enum, never from input.
        let sql = format!(
            "INSERT INTO {} (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            ns.table()
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?", ns.table());
        let value: Option<Vec<u8>> = sqlx::query_scalar(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn scan(&self, ns: Namespace) -> Result<Vec<(String, Vec<u8>)>> {
        let sql = format!("SELECT key, value FROM {} ORDER BY key", ns.table());
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect())
    }

    async fn contains(&self, ns: Namespace, key: &str) -> Result<bool> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE key = ?", ns.table());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(key)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}
