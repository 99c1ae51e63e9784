//! 캐시 테이블 저장소.
//!
//! Cache Manager가 요구하는 키-값 테이블 기능을 트레이트로 정의하고,
//! 두 가지 구현을 제공합니다:
//!
//! - [`postgres::PgCacheTable`]: PostgreSQL `market_cache` 테이블
//! - [`memory::MemoryCacheTable`]: 프로세스 내 HashMap (DB 미설정 시, 테스트용)
//!
//! 테이블 자체는 만료를 해석하지 않습니다. 만료 판정은 Cache Manager의 책임입니다.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_core::Payload;

use crate::error::Result;

pub use memory::MemoryCacheTable;
pub use postgres::{Database, PgCacheTable};

/// 캐시 테이블의 한 행.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    /// 캐시 키 (`<namespace>:<SYMBOL>:<range>:<interval>`)
    pub id: String,
    /// 정규화된 시세 페이로드
    pub data: Payload,
    /// 만료 시각 (UTC)
    pub expires_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(id: impl Into<String>, data: Payload, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            data,
            expires_at,
        }
    }

    /// `now` 기준으로 만료되었는지 확인합니다.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Cache Manager가 소비하는 영속 테이블 기능.
///
/// 모든 연산은 멱등적이며, 동일 키에 대한 동시 upsert는 마지막 쓰기가 이깁니다.
#[async_trait]
pub trait CacheTable: Send + Sync {
    /// id로 단건 조회.
    async fn get(&self, id: &str) -> Result<Option<CacheRecord>>;

    /// id 기준 삽입 또는 덮어쓰기.
    async fn upsert(&self, record: CacheRecord) -> Result<()>;

    /// id로 삭제. 실제로 삭제되었으면 `true`.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// id가 `prefix`로 시작하는 모든 행 삭제. 삭제된 행 수 반환.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize>;

    /// `expires_at < before`인 모든 행 삭제. 삭제된 행 수 반환.
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<usize>;

    /// 백엔드 이름 (로그/헬스 체크용).
    fn backend_name(&self) -> &'static str;
}
