//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/stock` - 단일 종목 시세
//! - `/api/v1/stocks` - 다중 종목 시세 (최대 50개)
//! - `/api/v1/crypto` - 암호화폐 시세
//! - `/api/v1/indices` - 주요 시장 지수
//! - `/api/v1/cache` - 캐시 무효화/정리

pub mod cache;
pub mod crypto;
pub mod health;
pub mod indices;
pub mod request;
pub mod stock;
pub mod stocks;

pub use cache::{cache_router, InvalidateResponse, SweepResponse};
pub use crypto::{crypto_router, CryptoRequest, SUPPORTED_CRYPTO};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use indices::{indices_router, IndicesQuery, IndicesRequest, MAJOR_INDICES};
pub use request::{QuoteOptions, SymbolList, MAX_BATCH_SYMBOLS};
pub use stock::{stock_router, StockRequest};
pub use stocks::{stocks_router, StocksRequest};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 모든 서브 라우터를 조합하여 하나의 라우터로 반환합니다.
pub fn create_api_router() -> Router<Arc<AppState>> {
    let v1 = Router::new()
        .merge(stock_router())
        .merge(stocks_router())
        .merge(crypto_router())
        .merge(indices_router())
        .merge(cache_router());

    Router::new()
        // 헬스 체크 엔드포인트
        .merge(health_router())
        // API v1 엔드포인트
        .nest("/api/v1", v1)
}
