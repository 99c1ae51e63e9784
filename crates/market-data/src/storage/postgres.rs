//! PostgreSQL 캐시 테이블 구현.
//!
//! 스키마 (`migrations/` 참조):
//!
//! ```sql
//! CREATE TABLE market_cache (
//!     id         TEXT PRIMARY KEY,
//!     data       JSONB NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_core::{DatabaseConfig, Payload};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{CacheRecord, CacheTable};
use crate::error::{DataError, Result};

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 새로운 데이터베이스 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| DataError::ConfigError("database.url is not set".to_string()))?;

        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 데이터베이스 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DataError::MigrationError(e.to_string()))?;

        info!("Migrations completed successfully");
        Ok(())
    }

    /// 데이터베이스 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }
}

#[derive(Debug, FromRow)]
struct CacheRow {
    id: String,
    data: Json<Payload>,
    expires_at: DateTime<Utc>,
}

impl From<CacheRow> for CacheRecord {
    fn from(row: CacheRow) -> Self {
        CacheRecord {
            id: row.id,
            data: row.data.0,
            expires_at: row.expires_at,
        }
    }
}

/// `market_cache` 테이블 기반 캐시 테이블.
#[derive(Clone)]
pub struct PgCacheTable {
    pool: PgPool,
}

impl PgCacheTable {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheTable for PgCacheTable {
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<CacheRecord>> {
        let row: Option<CacheRow> = sqlx::query_as(
            r#"
            SELECT id, data, expires_at
            FROM market_cache
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CacheRecord::from))
    }

    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn upsert(&self, record: CacheRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO market_cache (id, data, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                data = EXCLUDED.data,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&record.id)
        .bind(Json(&record.data))
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        debug!(expires_at = %record.expires_at, "캐시 행 저장");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM market_cache WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        // prefix는 리터럴 비교 (LIKE 와일드카드 해석 없음)
        let result = sqlx::query("DELETE FROM market_cache WHERE starts_with(id, $1)")
            .bind(prefix)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM market_cache WHERE expires_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
