//! 시세 캐시 매니저.
//!
//! 키 파생, 2단계 TTL 선택, read-through/write-through, 만료 검사,
//! 일괄 무효화/정리를 담당합니다.
//!
//! # Fail-open 계약
//!
//! 캐시는 best-effort입니다. 저장소 오류는 요청을 실패시키지 않습니다:
//!
//! | 연산          | 성공 시            | 저장소 오류 시 |
//! |---------------|--------------------|----------------|
//! | [`get`]       | `Some(payload)`    | `None` (miss)  |
//! | [`set`]       | `true`             | `false`        |
//! | [`invalidate`]| 삭제 건수          | `0`            |
//! | [`sweep`]     | 삭제 건수          | `0`            |
//!
//! 오류를 직접 다뤄야 하는 호출자는 `try_*` 메서드를 사용합니다.
//!
//! [`get`]: CacheManager::get
//! [`set`]: CacheManager::set
//! [`invalidate`]: CacheManager::invalidate
//! [`sweep`]: CacheManager::sweep

use chrono::{DateTime, Utc};
use market_core::{CacheConfig, Payload, DEFAULT_CACHE_NAMESPACE};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::policy::{cache_key, symbol_prefix, TtlPolicy};
use crate::error::Result;
use crate::storage::{CacheRecord, CacheTable};

/// 시세 캐시 매니저.
///
/// 프로세스 내 가변 상태가 없으며, 모든 상태는 외부 테이블에 있습니다.
/// 같은 키에 대한 동시 miss는 둘 다 upsert하며 마지막 쓰기가 남습니다.
#[derive(Clone)]
pub struct CacheManager {
    table: Arc<dyn CacheTable>,
    policy: TtlPolicy,
    namespace: String,
}

impl CacheManager {
    /// 기본 정책(`yf` 네임스페이스, 300s/600s)으로 생성합니다.
    pub fn new(table: Arc<dyn CacheTable>) -> Self {
        Self {
            table,
            policy: TtlPolicy::default(),
            namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
        }
    }

    /// 설정에서 정책과 네임스페이스를 읽어 생성합니다.
    pub fn from_config(table: Arc<dyn CacheTable>, config: &CacheConfig) -> Self {
        Self {
            table,
            policy: TtlPolicy::from_config(config),
            namespace: config.namespace.clone(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn table(&self) -> &Arc<dyn CacheTable> {
        &self.table
    }

    /// (symbol, range, interval) 조합의 캐시 키.
    pub fn derive_key(&self, symbol: &str, range: &str, interval: &str) -> String {
        cache_key(&self.namespace, symbol, range, interval)
    }

    /// 심볼에 적용할 TTL.
    pub fn ttl_for(&self, symbol: &str) -> Duration {
        self.policy.ttl_for(symbol)
    }

    // =========================================================================
    // 조회
    // =========================================================================

    /// 캐시된 페이로드를 조회합니다.
    ///
    /// 만료된 항목은 삭제 후 `None`을 반환합니다. 조회는 TTL을 연장하지 않습니다.
    /// 저장소 오류는 miss로 처리됩니다.
    pub async fn get(&self, symbol: &str, range: &str, interval: &str) -> Option<Payload> {
        match self.try_get(symbol, range, interval).await {
            Ok(payload) => payload,
            Err(e) => {
                counter!("market_cache_errors_total", "op" => "get").increment(1);
                warn!(symbol, range, interval, error = %e, "Cache retrieval failed, treating as miss");
                None
            }
        }
    }

    /// [`get`](Self::get)의 오류 전파 버전.
    #[instrument(skip(self))]
    pub async fn try_get(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Option<Payload>> {
        let key = self.derive_key(symbol, range, interval);

        let Some(record) = self.table.get(&key).await? else {
            counter!("market_cache_misses_total").increment(1);
            debug!(%key, "캐시 miss");
            return Ok(None);
        };

        if record.is_expired_at(Utc::now()) {
            counter!("market_cache_expired_total").increment(1);
            debug!(%key, expires_at = %record.expires_at, "만료된 캐시 항목 삭제");
            self.delete(&key).await;
            return Ok(None);
        }

        counter!("market_cache_hits_total").increment(1);
        debug!(%key, "캐시 hit");
        Ok(Some(record.data))
    }

    // =========================================================================
    // 저장
    // =========================================================================

    /// 페이로드를 TTL과 함께 저장합니다 (덮어쓰기).
    ///
    /// 성공 여부만 반환하며 오류는 전파하지 않습니다.
    pub async fn set(&self, symbol: &str, payload: &Payload, range: &str, interval: &str) -> bool {
        match self.try_set(symbol, payload, range, interval).await {
            Ok(_) => true,
            Err(e) => {
                counter!("market_cache_errors_total", "op" => "set").increment(1);
                warn!(symbol, range, interval, error = %e, "Cache storage failed");
                false
            }
        }
    }

    /// [`set`](Self::set)의 오류 전파 버전. 기록된 만료 시각을 반환합니다.
    #[instrument(skip(self, payload))]
    pub async fn try_set(
        &self,
        symbol: &str,
        payload: &Payload,
        range: &str,
        interval: &str,
    ) -> Result<DateTime<Utc>> {
        let key = self.derive_key(symbol, range, interval);
        let ttl = self.ttl_for(symbol);
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);

        self.table
            .upsert(CacheRecord::new(key.clone(), payload.clone(), expires_at))
            .await?;

        debug!(%key, ttl_secs = ttl.as_secs(), %expires_at, "캐시 저장");
        Ok(expires_at)
    }

    // =========================================================================
    // 삭제
    // =========================================================================

    /// 단일 키를 삭제합니다. 저장소 오류 시 `false`.
    pub async fn delete(&self, key: &str) -> bool {
        match self.table.delete(key).await {
            Ok(deleted) => deleted,
            Err(e) => {
                counter!("market_cache_errors_total", "op" => "delete").increment(1);
                warn!(%key, error = %e, "Cache deletion failed");
                false
            }
        }
    }

    /// 심볼의 모든 range/interval 항목을 삭제하고 삭제 건수를 반환합니다.
    pub async fn invalidate(&self, symbol: &str) -> usize {
        match self.try_invalidate(symbol).await {
            Ok(count) => count,
            Err(e) => {
                counter!("market_cache_errors_total", "op" => "invalidate").increment(1);
                warn!(symbol, error = %e, "Cache invalidation failed");
                0
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn try_invalidate(&self, symbol: &str) -> Result<usize> {
        let prefix = symbol_prefix(&self.namespace, symbol);
        let removed = self.table.delete_by_prefix(&prefix).await?;
        debug!(%prefix, removed, "심볼 캐시 무효화");
        Ok(removed)
    }

    /// 만료 시각이 현재보다 이전인 모든 항목을 삭제합니다.
    pub async fn sweep(&self) -> usize {
        match self.try_sweep().await {
            Ok(count) => count,
            Err(e) => {
                counter!("market_cache_errors_total", "op" => "sweep").increment(1);
                warn!(error = %e, "Cache cleanup failed");
                0
            }
        }
    }

    pub async fn try_sweep(&self) -> Result<usize> {
        let removed = self.table.delete_expired(Utc::now()).await?;
        if removed > 0 {
            counter!("market_cache_swept_total").increment(removed as u64);
        }
        Ok(removed)
    }
}
