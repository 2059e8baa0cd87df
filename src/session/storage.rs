use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::errors::AppResult;
use crate::utils::utc_now;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Raw contents of the two durable session slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSlots {
    pub token: Option<String>,
    pub user: Option<String>,
}

/// Durable key-value backing for the session.
///
/// Implementations must write and clear both slots together.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self) -> AppResult<StoredSlots>;

    async fn save(&self, token: &str, user: &str) -> AppResult<()>;

    async fn clear(&self) -> AppResult<()>;
}

/// SQLite-backed slots, one row per key in `session_slots`.
#[derive(Debug, Clone)]
pub struct SqliteSessionStorage {
    pool: SqlitePool,
}

impl SqliteSessionStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStorage for SqliteSessionStorage {
    async fn load(&self) -> AppResult<StoredSlots> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM session_slots WHERE key IN (?, ?)",
        )
        .bind(TOKEN_KEY)
        .bind(USER_KEY)
        .fetch_all(&self.pool)
        .await?;

        let mut slots = StoredSlots::default();
        for (key, value) in rows {
            match key.as_str() {
                TOKEN_KEY => slots.token = Some(value),
                USER_KEY => slots.user = Some(value),
                _ => {}
            }
        }

        Ok(slots)
    }

    async fn save(&self, token: &str, user: &str) -> AppResult<()> {
        let now = utc_now();
        let mut tx = self.pool.begin().await?;

        for (key, value) in [(TOKEN_KEY, token), (USER_KEY, user)] {
            sqlx::query(
                "INSERT INTO session_slots (key, value, updated_at) VALUES (?, ?, ?) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM session_slots WHERE key IN (?, ?)")
            .bind(TOKEN_KEY)
            .bind(USER_KEY)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Process-local slots, used by tests and one-shot tooling.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slots: Mutex<StoredSlots>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed arbitrary slot contents, including half-written ones.
    pub fn with_slots(slots: StoredSlots) -> Self {
        Self {
            slots: Mutex::new(slots),
        }
    }

    pub fn slots(&self) -> StoredSlots {
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> AppResult<StoredSlots> {
        Ok(self.slots())
    }

    async fn save(&self, token: &str, user: &str) -> AppResult<()> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slots = StoredSlots {
            token: Some(token.to_string()),
            user: Some(user.to_string()),
        };
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slots = StoredSlots::default();
        Ok(())
    }
}
