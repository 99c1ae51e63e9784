//! 캐시 관리 endpoint.
//!
//! - DELETE /api/v1/cache/{symbol} - 심볼의 모든 캐시 항목 무효화
//! - POST /api/v1/cache/sweep - 만료된 항목 정리

use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::request::parse_symbol;
use crate::error::ApiResult;
use crate::state::AppState;

/// 무효화 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub symbol: String,
    /// 삭제된 항목 수
    pub removed: usize,
}

/// 정리 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    /// 삭제된 항목 수
    pub removed: usize,
}

/// 심볼 캐시 무효화.
///
/// DELETE /api/v1/cache/{symbol}
pub async fn invalidate_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<InvalidateResponse>> {
    let symbol = parse_symbol(&symbol)?;
    let removed = state.cache.invalidate(&symbol).await;
    info!(%symbol, removed, "심볼 캐시 무효화 요청 처리");

    Ok(Json(InvalidateResponse { symbol, removed }))
}

/// 만료 캐시 정리.
///
/// POST /api/v1/cache/sweep
pub async fn sweep_cache(State(state): State<Arc<AppState>>) -> Json<SweepResponse> {
    let removed = state.cache.sweep().await;
    info!(removed, "캐시 정리 요청 처리");
    Json(SweepResponse { removed })
}

/// 캐시 관리 라우터 생성.
pub fn cache_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cache/sweep", post(sweep_cache))
        .route("/cache/{symbol}", delete(invalidate_symbol))
}

#[cfg(test)]
mod tests {
    use crate::routes::create_api_router;
    use crate::state::create_test_state;
    use crate::testing::send;
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, Utc};
    use market_core::Payload;
    use market_data::{CacheRecord, CacheTable};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_invalidate_symbol() {
        let state = Arc::new(create_test_state());
        for range in ["1d", "1mo"] {
            state.cache.set("AAPL", &Payload::new(), range, "1d").await;
        }
        state.cache.set("MSFT", &Payload::new(), "1d", "1d").await;

        let app = create_api_router().with_state(state.clone());
        let (status, body) = send(app, Method::DELETE, "/api/v1/cache/aapl", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "AAPL");
        assert_eq!(body["removed"], 2);
        assert!(state.cache.get("MSFT", "1d", "1d").await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_invalid_symbol() {
        let app = create_api_router().with_state(Arc::new(create_test_state()));
        let (status, body) = send(
            app,
            Method::DELETE,
            "/api/v1/cache/TOOLONGTICKER123",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SYMBOL");
    }

    #[tokio::test]
    async fn test_sweep() {
        let state = Arc::new(create_test_state());
        let table = state.cache.table().clone();
        table
            .upsert(CacheRecord::new(
                "yf:OLD:1d:1d",
                Payload::new(),
                Utc::now() - Duration::seconds(30),
            ))
            .await
            .unwrap();
        state.cache.set("NEW", &Payload::new(), "1d", "1d").await;

        let app = create_api_router().with_state(state);
        let (status, body) = send(app, Method::POST, "/api/v1/cache/sweep", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 1);
    }
}
