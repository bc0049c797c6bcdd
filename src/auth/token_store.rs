use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{TokenScope, TokenStore},
    error::Result,
};

/// Tokens persisted in a local SQLite file so a login survives restarts.
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations, then wrap the pool.
    pub async fn migrated(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self, scope: TokenScope) -> Result<Option<String>> {
        let token = sqlx::query_scalar::<_, String>(
            "SELECT token FROM auth_tokens WHERE scope = ?"
        )
        .bind(scope.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn set(&self, scope: TokenScope, token: &str) -> Result<()> {
        let now_naive = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO auth_tokens (scope, token, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(scope) DO UPDATE SET
                token = excluded.token,
                updated_at = excluded.updated_at
            "#
        )
        .bind(scope.as_str())
        .bind(token)
        .bind(now_naive)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored {} token", scope);
        Ok(())
    }

    async fn clear(&self, scope: TokenScope) -> Result<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE scope = ?")
            .bind(scope.as_str())
            .execute(&self.pool)
            .await?;

        tracing::debug!("Cleared {} token", scope);
        Ok(())
    }
}
