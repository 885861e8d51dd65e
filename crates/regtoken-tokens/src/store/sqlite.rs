//! SQLite token storage.

use super::TokenStore;
use crate::error::StoreError;
use crate::token::{Token, TokenRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;

/// Token store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct TokenRow {
    name: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    max_usage: i64,
    usage_count: i64,
    disabled: bool,
}

impl TryFrom<TokenRow> for Token {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let count = |value: i64, column: &str| {
            u32::try_from(value).map_err(|_| {
                StoreError::Corrupt(format!("token {}: {} out of range: {}", row.name, column, value))
            })
        };

        let record = TokenRecord {
            max_usage: count(row.max_usage, "max_usage")?,
            usage_count: count(row.usage_count, "usage_count")?,
            name: row.name.clone(),
            created_at: row.created_at,
            expires_at: row.expires_at,
            disabled: row.disabled,
        };
        Token::try_from(record)
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "Opened token database");
        Self::from_pool(pool).await
    }

    /// Use an existing pool, applying migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl TokenStore for SqliteStore {
    async fn load_all(&self) -> Result<Vec<Token>, StoreError> {
        let rows = sqlx::query_as::<_, TokenRow>(
            "SELECT name, created_at, expires_at, max_usage, usage_count, disabled FROM tokens ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Token::try_from).collect()
    }

    async fn upsert(&self, token: &Token) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tokens (name, created_at, expires_at, max_usage, usage_count, disabled) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(name) DO UPDATE SET \
             usage_count = MAX(tokens.usage_count, excluded.usage_count), \
             disabled = tokens.disabled OR excluded.disabled",
        )
        .bind(token.name())
        .bind(token.created_at())
        .bind(token.expires_at())
        .bind(i64::from(token.max_usage()))
        .bind(i64::from(token.usage_count()))
        .bind(token.is_disabled())
        .execute(&self.pool)
        .await?;

        tracing::debug!(token = %token.name(), "Stored token row");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upsert_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db/tokens.sqlite");
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let first = Token::issue("first".to_string(), created, Some(created + Duration::days(7)), 2);
        let second = Token::issue("second".to_string(), created, None, 0);

        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.upsert(&first).await.unwrap();
            store.upsert(&second).await.unwrap();
            store.upsert(&first.with_use()).await.unwrap();
            store.upsert(&second.with_disabled()).await.unwrap();
        }

        let store = SqliteStore::open(&path).await.unwrap();
        let loaded = store.load_all().await.unwrap();

        assert_eq!(loaded, vec![first.with_use(), second.with_disabled()]);
    }

    #[tokio::test]
    async fn test_stale_upsert_keeps_use_and_disable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.sqlite");
        let token = Token::issue("shared".to_string(), Utc::now(), None, 2);

        // One process disables the token, another still holds the old copy
        let cli = SqliteStore::open(&path).await.unwrap();
        let server = SqliteStore::open(&path).await.unwrap();
        server.upsert(&token).await.unwrap();
        cli.upsert(&token.with_use().with_disabled()).await.unwrap();
        server.upsert(&token).await.unwrap();

        let loaded = server.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].is_disabled());
        assert_eq!(loaded[0].usage_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("tokens.sqlite"))
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO tokens (name, created_at, max_usage, usage_count, disabled) VALUES ('bad', '2024-01-01T00:00:00Z', 1, 3, 0)",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        assert!(matches!(store.load_all().await, Err(StoreError::Corrupt(_))));
    }
}
