//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 공유됩니다.
//! 프로세스 내 가변 상태는 없으며, 캐시 상태는 모두 캐시 테이블에 있습니다.

use chrono::{DateTime, Utc};
use market_data::{CacheManager, Database, MarketDataProvider, QuoteService};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// read-through 시세 서비스
    pub quotes: QuoteService,

    /// 캐시 매니저 (무효화/정리 엔드포인트에서 직접 사용)
    pub cache: Arc<CacheManager>,

    /// 데이터베이스 연결 (미설정 시 인메모리 캐시 테이블 사용)
    pub db: Option<Database>,

    /// API 버전
    pub version: String,

    /// 서버 시작 시간
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 새로운 AppState 생성.
    pub fn new(cache: Arc<CacheManager>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            quotes: QuoteService::new(cache.clone(), provider),
            cache,
            db: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// 데이터베이스 연결 설정.
    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }

    /// 데이터베이스 연결 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        match &self.db {
            Some(db) => db.health_check().await.unwrap_or(false),
            None => false,
        }
    }

    /// 캐시 테이블 백엔드 이름 ("postgres" | "memory").
    pub fn cache_backend(&self) -> &'static str {
        self.cache.table().backend_name()
    }

    /// 시세 provider 이름.
    pub fn provider_name(&self) -> &'static str {
        self.quotes.provider().name()
    }

    /// 만료 캐시 정리 태스크 시작.
    ///
    /// `interval_secs`가 0이면 시작하지 않습니다.
    pub fn start_sweeper(
        &self,
        interval_secs: u64,
        shutdown: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if interval_secs == 0 {
            return None;
        }
        Some(market_data::spawn_sweeper(
            self.cache.clone(),
            std::time::Duration::from_secs(interval_secs),
            shutdown,
        ))
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// 인메모리 캐시 테이블과 [`StubProvider`](crate::testing::StubProvider)를 사용합니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    create_test_state_with(Arc::new(crate::testing::StubProvider::default()))
}

/// 지정한 provider로 테스트용 AppState 생성.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state_with(provider: Arc<dyn MarketDataProvider>) -> AppState {
    let table = Arc::new(market_data::MemoryCacheTable::new());
    AppState::new(Arc::new(CacheManager::new(table)), provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_defaults() {
        let state = create_test_state();
        assert!(state.db.is_none());
        assert_eq!(state.cache_backend(), "memory");
        assert_eq!(state.provider_name(), "stub");
        assert!(!state.version.is_empty());
        assert!(state.uptime_secs() >= 0);
    }

    #[tokio::test]
    async fn test_db_unhealthy_when_not_configured() {
        assert!(!create_test_state().is_db_healthy().await);
    }

    #[tokio::test]
    async fn test_sweeper_disabled_with_zero_interval() {
        let state = create_test_state();
        assert!(state.start_sweeper(0, CancellationToken::new()).is_none());

        let token = CancellationToken::new();
        let handle = state.start_sweeper(60, token.clone()).unwrap();
        token.cancel();
        handle.await.unwrap();
    }
}
