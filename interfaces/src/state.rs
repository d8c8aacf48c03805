use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::defs::UserOut;

/// Fixed slot holding the logged-in user.
pub const CURRENT_USER_KEY: &str = "CURRENT_USER";

pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    /// Open (creating if missing) the session database at `database_url`.
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.setup_schema().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::open("sqlite::memory:").await
    }

    async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS secure_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remember `user` as the current login, replacing any previous one.
    pub async fn save_user(&self, user: &UserOut) -> Result<()> {
        let value = serde_json::to_string(user)?;
        sqlx::query(
            r#"
            INSERT INTO secure_store (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT (key)
            DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(CURRENT_USER_KEY)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The stored login, or `None` when nobody is logged in or the slot is unreadable.
    pub async fn current_user(&self) -> Result<Option<UserOut>> {
        let row = sqlx::query("SELECT value FROM secure_store WHERE key = ?1")
            .bind(CURRENT_USER_KEY)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row.get("value");
        Ok(serde_json::from_str(&value).ok())
    }

    pub async fn current_user_id(&self) -> Result<Option<i64>> {
        Ok(self.current_user().await?.map(|user| user.user_id))
    }

    pub async fn logout(&self) -> Result<()> {
        sqlx::query("DELETE FROM secure_store WHERE key = ?1")
            .bind(CURRENT_USER_KEY)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write an arbitrary value under `key`.
    pub async fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO secure_store (key, value)
            VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
