//! `SQLite` implementation of the `KeyValueStore` trait.
//!
//! Each key is one row; values are stored as JSON text so the three
//! primitive kinds survive the round trip without a type column.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info, warn};

use hushcalc_core::error::DomainError;
use hushcalc_core::repository::{KeySpace, KeyValueStore, StoredValue};

use crate::schema::{CREATE_PREFERENCES_TABLE, UPSERT_PREFERENCE};

const MAX_CONNECTIONS: u32 = 4;

fn infrastructure(e: impl std::fmt::Display) -> DomainError {
    DomainError::Infrastructure(e.to_string())
}

/// SQLite-backed key-value store.
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Wraps an existing pool. The schema is not created; call `migrate`.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the database at `url`, creating the file and the schema if
    /// needed. An in-memory database is held on a single connection that is
    /// never recycled.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the URL is invalid or the
    /// database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(infrastructure)?
            .create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(infrastructure)?;
        info!(url, in_memory, "key-value store opened");

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Creates the schema if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the statement fails.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::query(CREATE_PREFERENCES_TABLE)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn load_all(&self) -> Result<KeySpace, DomainError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM preferences")
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        let mut entries = KeySpace::new();
        for (key, raw) in rows {
            match serde_json::from_str::<StoredValue>(&raw) {
                Ok(value) => {
                    entries.insert(key, value);
                }
                Err(e) => warn!(key, error = %e, "skipping unreadable stored value"),
            }
        }
        debug!(keys = entries.len(), "key space loaded");
        Ok(entries)
    }

    async fn put_all(&self, entries: &KeySpace) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        for (key, value) in entries {
            let json = serde_json::to_string(value).map_err(infrastructure)?;
            sqlx::query(UPSERT_PREFERENCE)
                .bind(key)
                .bind(json)
                .execute(&mut *tx)
                .await
                .map_err(infrastructure)?;
        }
        tx.commit().await.map_err(infrastructure)?;
        debug!(keys = entries.len(), "key space written");
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM preferences")
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(())
    }
}
